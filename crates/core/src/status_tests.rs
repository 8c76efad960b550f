// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[parameterized(
    offline = { ConnectivityStatus::Offline, false, false },
    unreachable = { ConnectivityStatus::OnlineUnreachable, true, false },
    reachable = { ConnectivityStatus::OnlineReachable, true, true },
)]
fn status_gating_flags(status: ConnectivityStatus, online: bool, reachable: bool) {
    assert_eq!(status.is_online(), online);
    assert_eq!(status.is_reachable(), reachable);
    assert_eq!(status.is_degraded(), !reachable);
}

#[parameterized(
    offline = { "offline", ConnectivityStatus::Offline },
    unreachable = { "online_unreachable", ConnectivityStatus::OnlineUnreachable },
    unreachable_short = { "unreachable", ConnectivityStatus::OnlineUnreachable },
    reachable = { "online_reachable", ConnectivityStatus::OnlineReachable },
    uppercase = { "OFFLINE", ConnectivityStatus::Offline },
)]
fn status_from_str(input: &str, expected: ConnectivityStatus) {
    assert_eq!(input.parse::<ConnectivityStatus>().unwrap(), expected);
}

#[test]
fn status_from_str_rejects_unknown() {
    let err = "sideways".parse::<ConnectivityStatus>().unwrap_err();
    assert!(matches!(err, Error::InvalidStatus(_)));
}

#[test]
fn status_display_matches_serde() {
    for status in [
        ConnectivityStatus::Offline,
        ConnectivityStatus::OnlineUnreachable,
        ConnectivityStatus::OnlineReachable,
    ] {
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, format!("\"{}\"", status));
    }
}

#[parameterized(
    reachable = { Some(true), Reachability::Reachable },
    unreachable = { Some(false), Reachability::Unreachable },
    timeout = { None, Reachability::Indeterminate },
)]
fn reachability_tri_state(reading: Option<bool>, expected: Reachability) {
    let value = Reachability::from(reading);
    assert_eq!(value, expected);
    assert_eq!(value.as_option(), reading);
}
