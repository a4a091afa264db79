//! The opcode namespace shared by the header and the message codec.

/// INSERT `[id: u64, vector: [f32; D]]`, client → index server.
pub const INSERT: u8 = 0x01;
/// `INSERT_RESULT`, index server → client. Shape: `OP_RESULT`.
pub const INSERT_RESULT: u8 = 0x02;
/// DELETE `[id: u64]`, client → index server.
pub const DELETE: u8 = 0x03;
/// `DELETE_RESULT`, index server → client. Shape: `OP_RESULT`.
pub const DELETE_RESULT: u8 = 0x04;
/// SEARCH `[vector: [f32; D], k: u32]`, client → index server.
pub const SEARCH: u8 = 0x05;
/// `MATCH_RESULT` `[[id: u64, distance: f32], ...]`, index server → client.
pub const MATCH_RESULT: u8 = 0x06;
/// ERROR, either server → client. Shape: `OP_RESULT`.
pub const ERROR: u8 = 0x07;
/// PUT `[key: bytes, value: bytes]`, client → table server.
pub const PUT: u8 = 0x08;
/// `PUT_RESULT`, table server → client. Shape: `OP_RESULT`.
pub const PUT_RESULT: u8 = 0x09;
/// GET `[key: bytes]`, client → table server.
pub const GET: u8 = 0x0A;
/// `GET_RESULT` `[value: bytes]`, table server → client.
pub const GET_RESULT: u8 = 0x0B;
/// DEL `[key: bytes]`, client → table server.
pub const DEL: u8 = 0x0C;
/// `DEL_RESULT`, table server → client. Shape: `OP_RESULT`.
pub const DEL_RESULT: u8 = 0x0D;

/// Result codes carried inside an `OP_RESULT` payload.
///
/// `0` always means success; the remaining values are a flat numbering of
/// the collaborator error taxonomies. They are not a CBOR wire concept of
/// their own: just the `code` field of `OP_RESULT`.
pub mod result_code {
    /// Operation applied successfully.
    pub const SUCCESS: u32 = 0;
    /// INSERT on an id already present in the index.
    pub const DUPLICATE: u32 = 1;
    /// DELETE/GET/DEL referencing an id or key that does not exist.
    pub const NOT_FOUND: u32 = 2;
    /// A vector whose length does not equal the server's dimensionality.
    pub const INVALID_DIMS: u32 = 3;
    /// I/O failure, allocation failure, or other collaborator-internal fault.
    pub const SYSTEM: u32 = 4;
    /// Malformed frame: bad CBOR, wrong arity, wrong element type, unknown
    /// opcode.
    pub const PROTOCOL: u32 = 5;
}
