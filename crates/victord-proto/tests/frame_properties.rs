//! Property-based tests for end-to-end frame + message round-tripping.
//!
//! These exercise the full path a server takes: build a [`Message`], encode
//! it into a [`Frame`], write the frame to a stream, read it back, and
//! decode the message again, for every opcode in the taxonomy, not just
//! the framing layer in isolation (see `src/header.rs` and `src/frame.rs`
//! for the unit-level round trips of those layers alone).

use std::io::Cursor;

use proptest::prelude::*;
use victord_proto::{Frame, Match, Message, OpResult, opcode};

fn arbitrary_vector() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(any::<f32>().prop_filter("finite", |f| f.is_finite()), 0..8)
}

fn arbitrary_bytes() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..32)
}

fn arbitrary_op_result() -> impl Strategy<Value = OpResult> {
    (0u32..8, "[a-z ]{0,16}").prop_map(|(code, message)| OpResult { code, message })
}

fn arbitrary_message() -> impl Strategy<Value = Message> {
    prop_oneof![
        (any::<u64>(), arbitrary_vector()).prop_map(|(id, vector)| Message::Insert { id, vector }),
        arbitrary_op_result().prop_map(Message::InsertResult),
        any::<u64>().prop_map(|id| Message::Delete { id }),
        arbitrary_op_result().prop_map(Message::DeleteResult),
        (arbitrary_vector(), any::<u32>()).prop_map(|(vector, k)| Message::Search { vector, k }),
        prop::collection::vec((any::<u64>(), any::<f32>().prop_filter("finite", |f| f.is_finite())), 0..8)
            .prop_map(|pairs| {
                Message::MatchResult(
                    pairs.into_iter().map(|(id, distance)| Match { id, distance }).collect(),
                )
            }),
        arbitrary_op_result().prop_map(Message::Error),
        (arbitrary_bytes(), arbitrary_bytes()).prop_map(|(key, value)| Message::Put { key, value }),
        arbitrary_op_result().prop_map(Message::PutResult),
        arbitrary_bytes().prop_map(|key| Message::Get { key }),
        arbitrary_bytes().prop_map(|value| Message::GetResult { value }),
        arbitrary_bytes().prop_map(|key| Message::Del { key }),
        arbitrary_op_result().prop_map(Message::DelResult),
    ]
}

#[test]
fn prop_message_survives_frame_and_stream_round_trip() {
    proptest!(|(message in arbitrary_message())| {
        let opcode = message.opcode();
        let payload = message.encode().expect("message encodes");
        let frame = Frame::new(opcode, payload).expect("fits in a frame");

        let mut wire = Vec::new();
        frame.write(&mut wire).expect("frame writes to the stream");

        let mut cursor = Cursor::new(wire);
        let read_back = Frame::read(&mut cursor).expect("frame reads back from the stream");
        prop_assert_eq!(read_back.header.opcode, opcode);

        let decoded = Message::decode(read_back.header.opcode, &read_back.payload)
            .expect("message decodes from the recovered payload");
        prop_assert_eq!(decoded, message);
    });
}

#[test]
fn every_opcode_constant_round_trips_through_header() {
    let opcodes = [
        opcode::INSERT,
        opcode::INSERT_RESULT,
        opcode::DELETE,
        opcode::DELETE_RESULT,
        opcode::SEARCH,
        opcode::MATCH_RESULT,
        opcode::ERROR,
        opcode::PUT,
        opcode::PUT_RESULT,
        opcode::GET,
        opcode::GET_RESULT,
        opcode::DEL,
        opcode::DEL_RESULT,
    ];
    for op in opcodes {
        let frame = Frame::new(op, Vec::new()).expect("zero-length payload always fits");
        let mut wire = Vec::new();
        frame.write(&mut wire).expect("writes");
        let mut cursor = Cursor::new(wire);
        let read_back = Frame::read(&mut cursor).expect("reads");
        assert_eq!(read_back.header.opcode, op);
    }
}
