// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use aether_core::ErrorCode;
use serde_json::json;

#[test]
fn frames_lift_type_and_id() {
    let frame = Frame::parse(r#"{"type":"process.spawn","id":"req-1","role":"R","goal":"g"}"#)
        .unwrap();
    assert_eq!(frame.kind, "process.spawn");
    assert_eq!(frame.id.as_deref(), Some("req-1"));
    assert_eq!(frame.payload["role"], "R");
    assert!(frame.payload.get("type").is_none());
}

#[test]
fn frames_without_id_are_valid() {
    let frame = Frame::parse(r#"{"type":"sub","topic":"agent.*"}"#).unwrap();
    assert_eq!(frame.kind, "sub");
    assert!(frame.id.is_none());
}

#[test]
fn malformed_frames_are_rejected() {
    assert!(matches!(
        Frame::parse("not json"),
        Err(FrameError::Malformed(_))
    ));
    assert!(matches!(Frame::parse("[1,2]"), Err(FrameError::NotAnObject)));
    assert!(matches!(
        Frame::parse(r#"{"id":"x"}"#),
        Err(FrameError::MissingType)
    ));
    assert!(matches!(
        Frame::parse(r#"{"type":42}"#),
        Err(FrameError::MissingType)
    ));
}

#[test]
fn ok_responses_echo_the_id() {
    let rendered = render_response(Some("req-9"), Ok(json!({"pid": 4})));
    let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
    assert_eq!(value["type"], "response.ok");
    assert_eq!(value["id"], "req-9");
    assert_eq!(value["data"]["pid"], 4);
}

#[test]
fn null_data_is_omitted() {
    let rendered = render_response(Some("req-9"), Ok(serde_json::Value::Null));
    let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
    assert!(value.get("data").is_none());
}

#[test]
fn err_responses_carry_stable_codes() {
    let rendered = render_response(
        Some("req-9"),
        Err(KernelError::new(ErrorCode::Forbidden, "nope")),
    );
    let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
    assert_eq!(value["type"], "response.err");
    assert_eq!(value["error"]["code"], "forbidden");
    assert_eq!(value["error"]["message"], "nope");
}

#[test]
fn bad_frame_reply_has_no_id() {
    let rendered = render_bad_frame("frame is not a JSON object");
    let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
    assert_eq!(value["error"]["code"], "bad_frame");
    assert!(value.get("id").is_none());
}
