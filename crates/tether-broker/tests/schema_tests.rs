//! Golden-shape assertions for the broker wire schema.
//!
//! The schema is transport-agnostic; JSON is used here as a stable reference
//! encoding so accidental renames or field reshuffles show up as test
//! failures.

use serde_json::json;
use tether_broker::{BrokerRequest, BrokerResponse, Envelope, PROTOCOL_VERSION};

#[test]
fn handshake_request_matches_golden() {
    let encoded = serde_json::to_value(BrokerRequest::Handshake).expect("encode");
    assert_eq!(encoded, json!("Handshake"));
}

#[test]
fn write_request_matches_golden() {
    let request = BrokerRequest::Write {
        id: "3676018a-94a4-4b07-81c2-dfa14b69b1fd".to_owned(),
        payload: vec![1, 2, 3],
    };
    let encoded = serde_json::to_value(&request).expect("encode");
    assert_eq!(
        encoded,
        json!({
            "Write": {
                "id": "3676018a-94a4-4b07-81c2-dfa14b69b1fd",
                "payload": [1, 2, 3],
            }
        })
    );
}

#[test]
fn read_request_matches_golden() {
    let request = BrokerRequest::Read {
        id: "abc".to_owned(),
        timeout_ms: 100,
    };
    let encoded = serde_json::to_value(&request).expect("encode");
    assert_eq!(
        encoded,
        json!({
            "Read": { "id": "abc", "timeout_ms": 100 }
        })
    );
}

#[test]
fn message_response_carries_version_field() {
    let response = BrokerResponse::Message(Envelope::new(Vec::new(), PROTOCOL_VERSION));
    let encoded = serde_json::to_value(&response).expect("encode");
    assert_eq!(
        encoded,
        json!({
            "Message": { "payload": [], "version": "v1" }
        })
    );
}

#[test]
fn responses_round_trip_through_json() {
    let responses = [
        BrokerResponse::Handshake {
            version: PROTOCOL_VERSION.to_owned(),
        },
        BrokerResponse::Written { delivered: true },
        BrokerResponse::Message(Envelope::new(b"payload".to_vec(), "v2")),
        BrokerResponse::TimedOut,
    ];
    for response in responses {
        let text = serde_json::to_string(&response).expect("encode");
        let decoded: BrokerResponse = serde_json::from_str(&text).expect("decode");
        assert_eq!(decoded, response);
    }
}
