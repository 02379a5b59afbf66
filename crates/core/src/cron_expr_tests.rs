// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

/// 2024-01-15 10:00:05 UTC
const T0: u64 = 1_705_312_805_000;

#[test]
fn five_field_expression_parses() {
    let schedule = CronSchedule::parse("* * * * *").unwrap();
    assert_eq!(schedule.source(), "* * * * *");
}

#[test]
fn macros_parse() {
    for expr in ["@hourly", "@daily", "@weekly", "@monthly"] {
        assert!(CronSchedule::parse(expr).is_ok(), "{expr} should parse");
    }
}

#[test]
fn malformed_expressions_are_rejected() {
    assert!(CronSchedule::parse("* *").is_err());
    assert!(CronSchedule::parse("not a cron").is_err());
    assert!(CronSchedule::parse("").is_err());
}

#[test]
fn every_minute_fires_at_next_minute_boundary() {
    let schedule = CronSchedule::parse("* * * * *").unwrap();
    let next = schedule.next_after(T0).unwrap();
    // T0 is at hh:00:05; next fire is hh:01:00.
    assert_eq!(next, T0 - 5_000 + 60_000);
}

#[test]
fn next_is_strictly_future() {
    let schedule = CronSchedule::parse("*/5 * * * *").unwrap();
    let mut t = T0;
    for _ in 0..10 {
        let next = schedule.next_after(t).unwrap();
        assert!(next > t);
        t = next;
    }
}

#[test]
fn next_is_monotone_in_argument() {
    let schedule = CronSchedule::parse("0 12 * * *").unwrap();
    let early = schedule.next_after(T0).unwrap();
    let late = schedule.next_after(T0 + 3_600_000).unwrap();
    assert!(late >= early);
}

#[test]
fn hourly_macro_fires_on_the_hour() {
    let schedule = CronSchedule::parse("@hourly").unwrap();
    let next = schedule.next_after(T0).unwrap();
    assert_eq!(next % 3_600_000, 0);
    assert!(next > T0);
}
