// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn pid_display_and_order() {
    assert_eq!(Pid(7).to_string(), "7");
    assert!(Pid(1) < Pid(2));
}

#[test]
fn pid_serializes_as_bare_integer() {
    let json = serde_json::to_string(&Pid(42)).unwrap();
    assert_eq!(json, "42");
    let back: Pid = serde_json::from_str("42").unwrap();
    assert_eq!(back, Pid(42));
}

#[test]
fn uid_short_truncates() {
    let uid = Uid::new("abcdef123456");
    assert_eq!(uid.short(6), "abcdef");
    assert_eq!(uid.short(100), "abcdef123456");
}

#[test]
fn uid_compares_with_str() {
    let uid = Uid::new("alice");
    assert_eq!(uid, "alice");
    assert_eq!(uid.as_str(), "alice");
}

#[test]
fn uuid_id_gen_produces_unique_ids() {
    let id_gen = UuidIdGen;
    let a = id_gen.next();
    let b = id_gen.next();
    assert_ne!(a, b);
}

#[test]
fn sequential_id_gen_counts_up() {
    let id_gen = SequentialIdGen::new("mem");
    assert_eq!(id_gen.next(), "mem-1");
    assert_eq!(id_gen.next(), "mem-2");
}
