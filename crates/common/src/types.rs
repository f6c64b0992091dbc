// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SSH Tunnel Status Contributors

// Common types for the tunnel status engine

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of the tunnel as reported by the supervisor process
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    Disconnected, // initial state, or cleanly torn down
    Connecting,   // supervisor is bringing the tunnel up
    Connected,    // port forwarding running
    Retrying,     // connection interrupted, supervisor is reconnecting
    Dropped,      // reconnect attempts exhausted
    Denied,       // server refused the credentials
    Unreachable,  // server could not be reached
    BadConfig,    // invalid connection parameters
    Error,        // supervisor-side failure
    Unknown,      // anything the decoder does not recognise
}

impl StatusCode {
    /// Every status code, in declaration order
    pub const ALL: [StatusCode; 10] = [
        StatusCode::Disconnected,
        StatusCode::Connecting,
        StatusCode::Connected,
        StatusCode::Retrying,
        StatusCode::Dropped,
        StatusCode::Denied,
        StatusCode::Unreachable,
        StatusCode::BadConfig,
        StatusCode::Error,
        StatusCode::Unknown,
    ];

    /// Wire token used by the supervisor for this status
    pub fn token(&self) -> &'static str {
        match self {
            StatusCode::Disconnected => "DISCONNECTED",
            StatusCode::Connecting => "CONNECTING",
            StatusCode::Connected => "CONNECTED",
            StatusCode::Retrying => "RETRYING",
            StatusCode::Dropped => "DROPPED",
            StatusCode::Denied => "DENIED",
            StatusCode::Unreachable => "UNREACHABLE",
            StatusCode::BadConfig => "BAD_CONFIG",
            StatusCode::Error => "ERROR",
            StatusCode::Unknown => "UNKNOWN",
        }
    }

    /// Check if the status represents an active connection
    pub fn is_connected(&self) -> bool {
        matches!(self, StatusCode::Connected)
    }

    /// Whether signals for this status may carry a free-form detail message
    pub fn carries_detail(&self) -> bool {
        matches!(
            self,
            StatusCode::BadConfig | StatusCode::Error | StatusCode::Unknown
        )
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Icon class shown next to a status label
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IconKind {
    Circle,
    Pending,
    Ok,
    Warn,
    Err,
    Alert,
    Question,
}

impl IconKind {
    /// CSS-style class name for the icon
    pub fn class_name(&self) -> &'static str {
        match self {
            IconKind::Circle => "circle",
            IconKind::Pending => "pending",
            IconKind::Ok => "ok",
            IconKind::Warn => "warn",
            IconKind::Err => "err",
            IconKind::Alert => "alert",
            IconKind::Question => "question",
        }
    }
}

/// Presentation data attached to a status code
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct DisplayInfo {
    pub label: &'static str,
    pub icon: IconKind,
}

/// How a status code drives notifications and persistence
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SideEffectClass {
    /// Tunnel is up
    Success,
    /// Tunnel is coming up or recovering
    TransientWarning,
    /// Attempt ended in failure
    TerminalFailure,
    /// Nothing is happening
    Neutral,
}

/// One transition recorded in the status history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub status: StatusCode,
}

impl HistoryEntry {
    /// ISO 8601 rendering of the timestamp
    pub fn iso_timestamp(&self) -> String {
        self.timestamp
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    }
}
