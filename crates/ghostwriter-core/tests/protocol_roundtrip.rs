//! Integration tests for the ghostwriter-core frame codec.
//!
//! A mock peer decodes whatever the client encodes (and vice versa) through
//! the public API only, the same way the PC-side server would see it.

use ghostwriter_core::{
    decode, encode_event, encode_frame, encode_handshake, encode_pong, ApplicationPacket,
    OpenPayload, TransportFrame,
};
use serde_json::{json, Value};

/// Decodes an outbound event frame the way the server would and returns the
/// `(name, data)` pair it carries.
fn peer_receive_event(raw: &str) -> (String, Value) {
    match decode(raw).expect("peer must decode client frames") {
        TransportFrame::Message(ApplicationPacket::Event { name, arg }) => {
            (name, arg.expect("client events always carry data"))
        }
        other => panic!("expected an event frame, got {other:?}"),
    }
}

#[test]
fn test_text_input_survives_client_to_peer_round_trip() {
    // Arrange
    let data = json!({"text": "hi"});

    // Act
    let (name, received) = peer_receive_event(&encode_event("text_input", &data));

    // Assert
    assert_eq!(name, "text_input");
    assert_eq!(received, data);
}

#[test]
fn test_event_payloads_of_every_json_shape_round_trip() {
    let payloads = [
        Value::Null,
        json!(true),
        json!(-12.5),
        json!("plain string"),
        json!([1, "two", {"three": 3}]),
        json!({"text": "多字節 text with \"quotes\" and \n newlines", "mode": "replace"}),
        json!({"nested": {"deep": {"deeper": [null, false]}}}),
    ];

    for data in payloads {
        let (name, received) = peer_receive_event(&encode_event("move_cursor", &data));
        assert_eq!(name, "move_cursor");
        assert_eq!(received, data);
    }
}

#[test]
fn test_handshake_decodes_as_connect_packet_on_peer() {
    assert_eq!(
        decode(&encode_handshake()),
        Ok(TransportFrame::Message(ApplicationPacket::Connect(None)))
    );
}

#[test]
fn test_pong_decodes_as_pong_on_peer() {
    assert_eq!(decode(&encode_pong()), Ok(TransportFrame::Pong));
}

#[test]
fn test_server_frames_built_by_peer_decode_on_client() {
    // Arrange – what a Socket.IO server sends during a normal session
    let frames = vec![
        TransportFrame::Open(OpenPayload {
            sid: Some("abc".to_string()),
            ping_interval: Some(25_000),
            ping_timeout: Some(20_000),
        }),
        TransportFrame::Message(ApplicationPacket::Connect(Some(json!({"sid": "s1"})))),
        TransportFrame::Ping,
        TransportFrame::Message(ApplicationPacket::Event {
            name: "context_update".to_string(),
            arg: Some(json!({"supported": true, "app_name": "Notepad", "before": "ab", "after": "c"})),
        }),
        TransportFrame::Close,
    ];

    for frame in frames {
        // Act
        let raw = encode_frame(&frame);

        // Assert
        assert_eq!(decode(&raw), Ok(frame), "frame {raw} must decode to itself");
    }
}

#[test]
fn test_scenario_frames_from_live_server_decode() {
    assert!(matches!(
        decode(r#"0{"sid":"abc","pingInterval":25000,"pingTimeout":20000}"#),
        Ok(TransportFrame::Open(_))
    ));
    assert_eq!(
        decode("40"),
        Ok(TransportFrame::Message(ApplicationPacket::Connect(None)))
    );
    assert_eq!(
        decode(r#"42["status_update",{"status":"connected","hostname":"PC1"}]"#),
        Ok(TransportFrame::Message(ApplicationPacket::Event {
            name: "status_update".to_string(),
            arg: Some(json!({"status": "connected", "hostname": "PC1"})),
        }))
    );
}

#[test]
fn test_garbage_never_panics() {
    let inputs = [
        "", "4", "42", "42[", "42null", "42\"str\"", "40{", "0", "0[]", "9", "\u{0}", "４２",
    ];
    for raw in inputs {
        // Only the absence of a panic matters here.
        let _ = decode(raw);
    }
}
