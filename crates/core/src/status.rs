// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity status and probe readings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Reconciled connectivity status published to consumers.
///
/// Always derived by the reconciler from link state and reachability; there
/// is no way for a consumer to set it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityStatus {
    /// No network interface is up.
    Offline,
    /// A link exists but the backend is not answering. Locally available
    /// data can still render.
    OnlineUnreachable,
    /// The backend answered the most recent probe.
    OnlineReachable,
}

impl ConnectivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectivityStatus::Offline => "offline",
            ConnectivityStatus::OnlineUnreachable => "online_unreachable",
            ConnectivityStatus::OnlineReachable => "online_reachable",
        }
    }

    /// True when the device has a network link, whether or not the backend answers.
    pub fn is_online(&self) -> bool {
        !matches!(self, ConnectivityStatus::Offline)
    }

    /// True only when the backend is known to answer.
    pub fn is_reachable(&self) -> bool {
        matches!(self, ConnectivityStatus::OnlineReachable)
    }

    /// True for the two states that count as "degraded" for user messaging.
    pub fn is_degraded(&self) -> bool {
        !self.is_reachable()
    }
}

impl fmt::Display for ConnectivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConnectivityStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "offline" => Ok(ConnectivityStatus::Offline),
            "online_unreachable" | "unreachable" => Ok(ConnectivityStatus::OnlineUnreachable),
            "online_reachable" | "reachable" | "online" => Ok(ConnectivityStatus::OnlineReachable),
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }
}

/// Result of a single backend reachability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reachability {
    Reachable,
    Unreachable,
    /// The probe did not complete within its timeout.
    Indeterminate,
}

impl Reachability {
    /// Maps to the tri-state `reachable: bool | null` reading.
    pub fn as_option(&self) -> Option<bool> {
        match self {
            Reachability::Reachable => Some(true),
            Reachability::Unreachable => Some(false),
            Reachability::Indeterminate => None,
        }
    }
}

impl From<Option<bool>> for Reachability {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Reachability::Reachable,
            Some(false) => Reachability::Unreachable,
            None => Reachability::Indeterminate,
        }
    }
}

impl fmt::Display for Reachability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Reachability::Reachable => "reachable",
            Reachability::Unreachable => "unreachable",
            Reachability::Indeterminate => "indeterminate",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
