//! Integration tests for the lamp-core wire format.
//!
//! These tests drive the public API the way the hub and the simulator do:
//! messages are built with the `LampMessage` builders, encoded, fed through a
//! `JsonStreamDecoder` in arbitrary chunks, and interpreted back.

use lamp_core::{
    encode_message,
    protocol::messages::{DEVICE_LAMP_ESP, EVENT_UPDATE},
    EspLampState, JsonStreamDecoder, LampMessage, NrfLampState, ProtocolError, UserButton,
};

/// Decodes every object in `bytes`, feeding the decoder `chunk` bytes at a time.
fn decode_chunked(bytes: &[u8], chunk: usize) -> Vec<LampMessage> {
    let mut dec = JsonStreamDecoder::new();
    let mut out = Vec::new();
    for piece in bytes.chunks(chunk) {
        for item in dec.push(piece) {
            let obj = item.expect("stream must only contain objects");
            out.push(LampMessage::from_object(&obj).expect("object must be a lamp message"));
        }
    }
    assert_eq!(dec.pending(), 0, "no bytes may be left over");
    out
}

#[test]
fn test_hub_commands_survive_byte_at_a_time_delivery() {
    // Arrange
    let mut stream = encode_message(&LampMessage::req_update()).unwrap();
    stream.extend(encode_message(&LampMessage::user_click(UserButton::LampEspOn)).unwrap());

    // Act
    let decoded = decode_chunked(&stream, 1);

    // Assert
    assert_eq!(
        decoded,
        vec![
            LampMessage::req_update(),
            LampMessage::user_click(UserButton::LampEspOn)
        ]
    );
}

#[test]
fn test_esp_update_sequence_follows_click_cycle() {
    let mut state = EspLampState::Off;
    let mut stream = Vec::new();
    for _ in 0..3 {
        state = state.next_on_click();
        stream.extend(encode_message(&LampMessage::update(DEVICE_LAMP_ESP, state.as_arg())).unwrap());
    }

    let decoded = decode_chunked(&stream, 7);

    let states: Vec<_> = decoded
        .iter()
        .filter(|m| m.event == EVENT_UPDATE)
        .filter_map(|m| EspLampState::from_arg(m.arg1))
        .collect();
    assert_eq!(
        states,
        vec![
            EspLampState::ColorWhite,
            EspLampState::ColorYellow,
            EspLampState::ColorRed
        ]
    );
}

#[test]
fn test_garbage_between_messages_drops_only_the_bad_chunk() {
    let mut dec = JsonStreamDecoder::new();

    let first = dec.push(&encode_message(&LampMessage::req_update()).unwrap());
    let garbage = dec.push(b"}}}");
    let last = dec.push(&encode_message(&LampMessage::update(DEVICE_LAMP_ESP, 1)).unwrap());

    assert_eq!(first.len(), 1);
    assert!(matches!(garbage.as_slice(), [Err(ProtocolError::Malformed(_))]));
    assert_eq!(last.len(), 1);
    assert!(last[0].is_ok());
}

#[test]
fn test_nrf_wire_bytes_match_update_args() {
    for byte in [0u8, 1] {
        let state = NrfLampState::from_wire(&[byte]);
        assert_eq!(state.as_arg(), Some(i64::from(byte)));
    }
}
