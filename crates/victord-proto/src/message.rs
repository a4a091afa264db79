//! CBOR message taxonomy.
//!
//! Payloads are decoded through [`ciborium::value::Value`] rather than via
//! `#[derive(Deserialize)]` on plain structs. A derived struct would decode
//! as a CBOR map with named fields, but the wire contract here is a
//! *definite-length array* with positional, width-flexible elements (any
//! CBOR integer width up to 64 bits, both 32- and 64-bit CBOR floats
//! narrowed to `f32`) and an explicit arity check per opcode. Going through
//! `Value` lets us enforce exactly that contract and reject malformed input
//! with a precise [`ProtocolError`] instead of a generic deserialize error.

use ciborium::value::{Integer, Value};

use crate::{
    error::{ProtocolError, Result},
    opcode,
};

/// Result of a mutation or lookup, `[code: u32, message: text]`.
///
/// `code == 0` is success; see [`crate::opcode::result_code`] for the
/// taxonomy of non-zero codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpResult {
    /// Zero for success, otherwise a [`crate::opcode::result_code`] value.
    pub code: u32,
    /// Human-readable detail. May be empty.
    pub message: String,
}

impl OpResult {
    /// Build a success result with an empty message.
    #[must_use]
    pub fn ok() -> Self {
        Self { code: opcode::result_code::SUCCESS, message: String::new() }
    }

    /// Build a failure result.
    #[must_use]
    pub fn err(code: u32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    /// True if `code == 0`.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == opcode::result_code::SUCCESS
    }
}

/// One element of a `MATCH_RESULT` list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    /// Identifier of the matched vector.
    pub id: u64,
    /// Distance reported by the collaborator index (smaller = more similar
    /// for every method this codec is paired with; see the index crate).
    pub distance: f32,
}

/// A fully decoded request or response, independent of its wire opcode.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// `[id, vector]` → index server.
    Insert {
        /// Vector identifier. Must be unique within the index.
        id: u64,
        /// Raw vector elements, not yet checked against server dimensionality.
        vector: Vec<f32>,
    },
    /// `OP_RESULT` ← index server.
    InsertResult(OpResult),
    /// `[id]` → index server.
    Delete {
        /// Vector identifier to remove.
        id: u64,
    },
    /// `OP_RESULT` ← index server.
    DeleteResult(OpResult),
    /// `[vector, k]` → index server.
    Search {
        /// Query vector, not yet checked against server dimensionality.
        vector: Vec<f32>,
        /// Requested neighbor count, before clamping to the collaborator max.
        k: u32,
    },
    /// `[[id, distance], ...]` ← index server.
    MatchResult(Vec<Match>),
    /// `OP_RESULT` ← either server.
    Error(OpResult),
    /// `[key, value]` → table server.
    Put {
        /// Key bytes.
        key: Vec<u8>,
        /// Value bytes. May be empty.
        value: Vec<u8>,
    },
    /// `OP_RESULT` ← table server.
    PutResult(OpResult),
    /// `[key]` → table server.
    Get {
        /// Key bytes to look up.
        key: Vec<u8>,
    },
    /// `[value]` ← table server.
    GetResult {
        /// Stored value. May be empty.
        value: Vec<u8>,
    },
    /// `[key]` → table server.
    Del {
        /// Key bytes to remove.
        key: Vec<u8>,
    },
    /// `OP_RESULT` ← table server.
    DelResult(OpResult),
}

impl Message {
    /// The opcode this message is carried under on the wire.
    #[must_use]
    pub fn opcode(&self) -> u8 {
        match self {
            Self::Insert { .. } => opcode::INSERT,
            Self::InsertResult(_) => opcode::INSERT_RESULT,
            Self::Delete { .. } => opcode::DELETE,
            Self::DeleteResult(_) => opcode::DELETE_RESULT,
            Self::Search { .. } => opcode::SEARCH,
            Self::MatchResult(_) => opcode::MATCH_RESULT,
            Self::Error(_) => opcode::ERROR,
            Self::Put { .. } => opcode::PUT,
            Self::PutResult(_) => opcode::PUT_RESULT,
            Self::Get { .. } => opcode::GET,
            Self::GetResult { .. } => opcode::GET_RESULT,
            Self::Del { .. } => opcode::DEL,
            Self::DelResult(_) => opcode::DEL_RESULT,
        }
    }

    /// Serialize the payload (not the frame header) to CBOR bytes.
    ///
    /// This function has no size ceiling of its own. The size ceiling is
    /// enforced at the frame layer, not here.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let value = self.to_value();
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&value, &mut buf)
            .map_err(|err| ProtocolError::Cbor(err.to_string()))?;
        Ok(buf)
    }

    fn to_value(&self) -> Value {
        match self {
            Self::Insert { id, vector } => {
                Value::Array(vec![Value::from(*id), vector_value(vector)])
            },
            Self::InsertResult(result)
            | Self::DeleteResult(result)
            | Self::Error(result)
            | Self::PutResult(result)
            | Self::DelResult(result) => op_result_value(result),
            Self::Delete { id } => Value::Array(vec![Value::from(*id)]),
            Self::Search { vector, k } => {
                Value::Array(vec![vector_value(vector), Value::from(*k)])
            },
            Self::MatchResult(matches) => Value::Array(
                matches
                    .iter()
                    .map(|m| {
                        Value::Array(vec![Value::from(m.id), Value::Float(f64::from(m.distance))])
                    })
                    .collect(),
            ),
            Self::Put { key, value } => {
                Value::Array(vec![Value::Bytes(key.clone()), Value::Bytes(value.clone())])
            },
            Self::Get { key } | Self::Del { key } => Value::Array(vec![Value::Bytes(key.clone())]),
            Self::GetResult { value } => Value::Array(vec![Value::Bytes(value.clone())]),
        }
    }

    /// Decode a payload for a known opcode.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownOpcode`], [`ProtocolError::Cbor`],
    /// [`ProtocolError::WrongArity`], [`ProtocolError::WrongType`], or
    /// [`ProtocolError::IntegerOutOfRange`] as appropriate.
    pub fn decode(opcode: u8, payload: &[u8]) -> Result<Self> {
        let value: Value = ciborium::de::from_reader(payload)
            .map_err(|err| ProtocolError::Cbor(err.to_string()))?;
        let items = array_of(&value)?;

        match opcode {
            self::opcode::INSERT => {
                require_arity(opcode, items, 2)?;
                Ok(Self::Insert { id: as_u64(&items[0], "id")?, vector: as_vector(&items[1])? })
            },
            self::opcode::INSERT_RESULT => Ok(Self::InsertResult(as_op_result(items, opcode)?)),
            self::opcode::DELETE => {
                require_arity(opcode, items, 1)?;
                Ok(Self::Delete { id: as_u64(&items[0], "id")? })
            },
            self::opcode::DELETE_RESULT => Ok(Self::DeleteResult(as_op_result(items, opcode)?)),
            self::opcode::SEARCH => {
                require_arity(opcode, items, 2)?;
                Ok(Self::Search { vector: as_vector(&items[0])?, k: as_u32(&items[1], "k")? })
            },
            self::opcode::MATCH_RESULT => {
                let mut matches = Vec::with_capacity(items.len());
                for item in items {
                    let pair = array_of(item)?;
                    require_arity(opcode, pair, 2)?;
                    matches.push(Match {
                        id: as_u64(&pair[0], "id")?,
                        distance: as_f32(&pair[1], "distance")?,
                    });
                }
                Ok(Self::MatchResult(matches))
            },
            self::opcode::ERROR => Ok(Self::Error(as_op_result(items, opcode)?)),
            self::opcode::PUT => {
                require_arity(opcode, items, 2)?;
                Ok(Self::Put {
                    key: as_bytes(&items[0], "key")?,
                    value: as_bytes(&items[1], "value")?,
                })
            },
            self::opcode::PUT_RESULT => Ok(Self::PutResult(as_op_result(items, opcode)?)),
            self::opcode::GET => {
                require_arity(opcode, items, 1)?;
                Ok(Self::Get { key: as_bytes(&items[0], "key")? })
            },
            self::opcode::GET_RESULT => {
                require_arity(opcode, items, 1)?;
                Ok(Self::GetResult { value: as_bytes(&items[0], "value")? })
            },
            self::opcode::DEL => {
                require_arity(opcode, items, 1)?;
                Ok(Self::Del { key: as_bytes(&items[0], "key")? })
            },
            self::opcode::DEL_RESULT => Ok(Self::DelResult(as_op_result(items, opcode)?)),
            other => Err(ProtocolError::UnknownOpcode(other)),
        }
    }
}

fn op_result_value(result: &OpResult) -> Value {
    Value::Array(vec![Value::from(result.code), Value::Text(result.message.clone())])
}

fn vector_value(vector: &[f32]) -> Value {
    Value::Array(vector.iter().map(|element| Value::Float(f64::from(*element))).collect())
}

fn array_of(value: &Value) -> Result<&Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(ProtocolError::WrongType { field: "payload" }),
    }
}

fn require_arity(opcode: u8, items: &[Value], expected: usize) -> Result<()> {
    if items.len() != expected {
        return Err(ProtocolError::WrongArity { opcode, expected, actual: items.len() });
    }
    Ok(())
}

fn as_op_result(items: &[Value], opcode: u8) -> Result<OpResult> {
    require_arity(opcode, items, 2)?;
    let code = as_u32(&items[0], "code")?;
    let message = as_text(&items[1], "message")?;
    Ok(OpResult { code, message })
}

fn as_integer(value: &Value, field: &'static str) -> Result<Integer> {
    value.as_integer().ok_or(ProtocolError::WrongType { field })
}

fn as_u64(value: &Value, field: &'static str) -> Result<u64> {
    as_integer(value, field)?.try_into().map_err(|_| ProtocolError::IntegerOutOfRange { field })
}

fn as_u32(value: &Value, field: &'static str) -> Result<u32> {
    let wide: u64 = as_u64(value, field)?;
    u32::try_from(wide).map_err(|_| ProtocolError::IntegerOutOfRange { field })
}

fn as_f32(value: &Value, field: &'static str) -> Result<f32> {
    // CBOR floats of any width decode into `Value::Float(f64)`; narrowing
    // here is the "accept 64-bit, narrow to f32" rule for every float field.
    value.as_float().map(|f| f as f32).ok_or(ProtocolError::WrongType { field })
}

fn as_vector(value: &Value) -> Result<Vec<f32>> {
    let items = match value {
        Value::Array(items) => items,
        _ => return Err(ProtocolError::WrongType { field: "vector" }),
    };
    items.iter().map(|item| as_f32(item, "vector[i]")).collect()
}

fn as_bytes(value: &Value, field: &'static str) -> Result<Vec<u8>> {
    match value {
        Value::Bytes(bytes) => Ok(bytes.clone()),
        _ => Err(ProtocolError::WrongType { field }),
    }
}

fn as_text(value: &Value, field: &'static str) -> Result<String> {
    match value {
        Value::Text(text) => Ok(text.clone()),
        _ => Err(ProtocolError::WrongType { field }),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn arbitrary_vector() -> impl Strategy<Value = Vec<f32>> {
        prop::collection::vec(any::<f32>().prop_filter("finite", |f| f.is_finite()), 0..8)
    }

    fn arbitrary_bytes() -> impl Strategy<Value = Vec<u8>> {
        prop::collection::vec(any::<u8>(), 0..16)
    }

    fn arbitrary_message() -> impl Strategy<Value = Message> {
        prop_oneof![
            (any::<u64>(), arbitrary_vector())
                .prop_map(|(id, vector)| Message::Insert { id, vector }),
            any::<u64>().prop_map(|id| Message::Delete { id }),
            (arbitrary_vector(), any::<u32>()).prop_map(|(vector, k)| Message::Search { vector, k }),
            (arbitrary_bytes(), arbitrary_bytes())
                .prop_map(|(key, value)| Message::Put { key, value }),
            arbitrary_bytes().prop_map(|key| Message::Get { key }),
            arbitrary_bytes().prop_map(|key| Message::Del { key }),
        ]
    }

    proptest! {
        #[test]
        fn message_round_trip(message in arbitrary_message()) {
            let opcode = message.opcode();
            let encoded = message.encode().expect("encodes");
            let decoded = Message::decode(opcode, &encoded).expect("decodes");
            prop_assert_eq!(message, decoded);
        }
    }

    #[test]
    fn op_result_round_trip() {
        let message = Message::Error(OpResult::err(opcode::result_code::NOT_FOUND, "missing"));
        let encoded = message.encode().expect("encodes");
        let decoded = Message::decode(opcode::ERROR, &encoded).expect("decodes");
        assert_eq!(message, decoded);
    }

    #[test]
    fn match_result_round_trip() {
        let message =
            Message::MatchResult(vec![Match { id: 42, distance: 0.0 }, Match { id: 7, distance: 1.5 }]);
        let encoded = message.encode().expect("encodes");
        let decoded = Message::decode(opcode::MATCH_RESULT, &encoded).expect("decodes");
        assert_eq!(message, decoded);
    }

    #[test]
    fn accepts_64_bit_float_narrowed_to_f32() {
        // Build an INSERT payload by hand with Float elements, as a CBOR
        // encoder targeting f64 precision would.
        let value = Value::Array(vec![
            Value::from(1u64),
            Value::Array(vec![Value::Float(1.0), Value::Float(0.5)]),
        ]);
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&value, &mut buf).expect("encodes");
        let decoded = Message::decode(opcode::INSERT, &buf).expect("decodes");
        assert_eq!(decoded, Message::Insert { id: 1, vector: vec![1.0, 0.5] });
    }

    #[test]
    fn accepts_minimal_width_unsigned_integer() {
        let value = Value::Array(vec![Value::from(0u8), Value::Array(vec![])]);
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&value, &mut buf).expect("encodes");
        let decoded = Message::decode(opcode::INSERT, &buf).expect("decodes");
        assert_eq!(decoded, Message::Insert { id: 0, vector: vec![] });
    }

    #[test]
    fn rejects_wrong_arity() {
        let value = Value::Array(vec![Value::from(1u64)]);
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&value, &mut buf).expect("encodes");
        let result = Message::decode(opcode::INSERT, &buf);
        assert!(matches!(result, Err(ProtocolError::WrongArity { .. })));
    }

    #[test]
    fn rejects_wrong_type_in_fixed_slot() {
        let value = Value::Array(vec![Value::Text("not-an-id".into()), Value::Array(vec![])]);
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&value, &mut buf).expect("encodes");
        let result = Message::decode(opcode::INSERT, &buf);
        assert!(matches!(result, Err(ProtocolError::WrongType { .. })));
    }

    #[test]
    fn rejects_unknown_opcode() {
        let result = Message::decode(0x0F, &[]);
        assert!(matches!(result, Err(ProtocolError::UnknownOpcode(0x0F))));
    }
}
