// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    offline = { MessageClass::Degraded, ConnectivityStatus::Offline, "You're offline" },
    unreachable = { MessageClass::Degraded, ConnectivityStatus::OnlineUnreachable, "Can't reach Morsel" },
    restored = { MessageClass::Restored, ConnectivityStatus::OnlineReachable, "Back online" },
)]
fn title_follows_class_and_status(class: MessageClass, status: ConnectivityStatus, title: &str) {
    let n = Notification::for_status(class, status);
    assert_eq!(n.title, title);
    assert_eq!(n.class, class);
}

#[test]
fn announcement_joins_title_and_body() {
    let n = Notification::for_status(MessageClass::Restored, ConnectivityStatus::OnlineReachable);
    assert_eq!(n.announcement(), "Back online. Syncing your saved changes.");
}
