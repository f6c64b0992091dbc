// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SSH Tunnel Status Contributors

//! Observable system state
//!
//! A [`SystemState`] is an immutable snapshot. The reducer never edits one in place;
//! every processed signal produces a new value that replaces the previous one.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tunnel_status_common::{lookup, DisplayInfo, StatusCode, UserSettings};

use crate::history::History;

/// Which error source produced the most recent non-null error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSource {
    Connection,
    Settings,
}

/// Snapshot of the connection status published to observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemState {
    /// Current status
    pub status: StatusCode,

    /// Presentation data for the current status
    pub display_info: DisplayInfo,

    /// Error shown to the user: the most recent non-null of the two sources below
    pub system_error: Option<String>,

    /// Error derived from the current status
    pub connection_error: Option<String>,

    /// Error from the last settings write
    pub settings_error: Option<String>,

    /// Source of the most recently produced error
    pub last_error_source: Option<ErrorSource>,

    /// Connection parameters submitted for this session
    pub settings: Option<UserSettings>,

    /// Status transitions since the session started
    pub history: History,
}

impl SystemState {
    /// Fresh state at session start
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            status: StatusCode::Disconnected,
            display_info: lookup(StatusCode::Disconnected),
            system_error: None,
            connection_error: None,
            settings_error: None,
            last_error_source: None,
            settings: None,
            history: History::new(started_at),
        }
    }

    /// Copy of this state carrying the given connection parameters
    pub fn with_settings(&self, settings: UserSettings) -> Self {
        Self {
            settings: Some(settings),
            ..self.clone()
        }
    }

    /// Copy of this state with the connection error replaced
    pub(crate) fn with_connection_error(&self, error: Option<String>) -> Self {
        let mut next = self.clone();
        if error.is_some() {
            next.last_error_source = Some(ErrorSource::Connection);
        }
        next.connection_error = error;
        next.resurface();
        next
    }

    /// Copy of this state with the settings error replaced
    pub(crate) fn with_settings_error(&self, error: Option<String>) -> Self {
        let mut next = self.clone();
        if error.is_some() {
            next.last_error_source = Some(ErrorSource::Settings);
        }
        next.settings_error = error;
        next.resurface();
        next
    }

    /// Recompute `system_error` from the two sources
    fn resurface(&mut self) {
        let (latest, other) = match self.last_error_source {
            Some(ErrorSource::Settings) => (&self.settings_error, &self.connection_error),
            _ => (&self.connection_error, &self.settings_error),
        };
        self.system_error = latest.clone().or_else(|| other.clone());
    }

    /// Whether the tunnel is currently up
    pub fn is_connected(&self) -> bool {
        self.status.is_connected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> SystemState {
        SystemState::new(Utc::now())
    }

    #[test]
    fn test_initial_state() {
        let state = state();
        assert_eq!(state.status, StatusCode::Disconnected);
        assert_eq!(state.display_info, lookup(StatusCode::Disconnected));
        assert!(state.system_error.is_none());
        assert_eq!(state.history.len(), 1);
        assert!(!state.is_connected());
    }

    #[test]
    fn test_most_recent_error_is_surfaced() {
        let state = state()
            .with_connection_error(Some("Incorrect IP Address".to_string()))
            .with_settings_error(Some("disk full".to_string()));
        assert_eq!(state.system_error.as_deref(), Some("disk full"));

        let state = state.with_connection_error(Some("Incorrect IP Address".to_string()));
        assert_eq!(state.system_error.as_deref(), Some("Incorrect IP Address"));
    }

    #[test]
    fn test_cleared_error_falls_back_to_other_source() {
        let state = state()
            .with_settings_error(Some("disk full".to_string()))
            .with_connection_error(Some("Incorrect IP Address".to_string()))
            .with_connection_error(None);
        assert_eq!(state.system_error.as_deref(), Some("disk full"));

        let state = state.with_settings_error(None);
        assert!(state.system_error.is_none());
    }
}
