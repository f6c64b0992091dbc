// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SSH Tunnel Status Contributors

//! Status history: an append-only record of status transitions
//!
//! Consecutive duplicates are suppressed, so adjacent entries never share a status.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tunnel_status_common::{HistoryEntry, StatusCode};

/// Deduplicated history of status transitions for one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    /// Start a history with the session's initial `DISCONNECTED` entry
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            entries: vec![HistoryEntry {
                timestamp: started_at,
                status: StatusCode::Disconnected,
            }],
        }
    }

    /// Return the history with `status` appended, unless it repeats the last entry
    pub fn append(&self, status: StatusCode, now: DateTime<Utc>) -> Self {
        if self.last_status() == status {
            return self.clone();
        }

        let mut entries = Vec::with_capacity(self.entries.len() + 1);
        entries.extend_from_slice(&self.entries);
        entries.push(HistoryEntry {
            timestamp: now,
            status,
        });
        Self { entries }
    }

    /// Status of the most recent entry
    pub fn last_status(&self) -> StatusCode {
        self.entries
            .last()
            .map(|entry| entry.status)
            .unwrap_or(StatusCode::Disconnected)
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_initial_history() {
        let history = History::new(t0());
        assert_eq!(history.len(), 1);
        assert_eq!(history.entries()[0].timestamp, t0());
        assert_eq!(history.last_status(), StatusCode::Disconnected);
    }

    #[test]
    fn test_duplicate_is_suppressed() {
        let history = History::new(t0())
            .append(StatusCode::Connected, t0() + Duration::seconds(1))
            .append(StatusCode::Connected, t0() + Duration::seconds(2));

        assert_eq!(history.len(), 2);
        // The first timestamp of a run is kept
        assert_eq!(history.entries()[1].timestamp, t0() + Duration::seconds(1));
    }

    #[test]
    fn test_initial_disconnected_is_suppressed() {
        let history = History::new(t0()).append(StatusCode::Disconnected, t0());
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_no_adjacent_duplicates_over_sequence() {
        let sequence = [
            StatusCode::Connecting,
            StatusCode::Connecting,
            StatusCode::Connected,
            StatusCode::Retrying,
            StatusCode::Retrying,
            StatusCode::Connected,
            StatusCode::Dropped,
            StatusCode::Dropped,
            StatusCode::Disconnected,
        ];

        let mut history = History::new(t0());
        for (i, status) in sequence.into_iter().enumerate() {
            history = history.append(status, t0() + Duration::seconds(i as i64 + 1));
        }

        assert_eq!(history.len(), 7);
        for pair in history.entries().windows(2) {
            assert_ne!(pair[0].status, pair[1].status);
        }
    }

    #[test]
    fn test_append_leaves_original_untouched() {
        let original = History::new(t0());
        let appended = original.append(StatusCode::Connecting, t0());
        assert_eq!(original.len(), 1);
        assert_eq!(appended.len(), 2);
    }

    #[test]
    fn test_serializes_as_entry_list() {
        let history = History::new(t0());
        let json = serde_json::to_value(&history).unwrap();
        assert_eq!(json[0]["status"], "DISCONNECTED");
        assert_eq!(json[0]["timestamp"], "2025-01-01T00:00:00Z");
    }
}
