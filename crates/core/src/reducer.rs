// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SSH Tunnel Status Contributors

//! Status reducer
//!
//! [`reduce`] folds one raw signal into the previous [`SystemState`] and returns the next
//! state together with the side effects to run, in order. It is a pure function: the
//! notification permission and the clock are inputs, and effects are data.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tunnel_status_common::{
    decode, lookup, side_effect_class, SideEffectClass, StatusCode, UserSettings,
};

use crate::state::SystemState;

pub const DENIED_MESSAGE: &str = "Incorrect username or bad ssh key";
pub const UNREACHABLE_MESSAGE: &str = "Incorrect IP Address";

/// A side effect scheduled by the reducer, not yet performed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    /// Show a user notification
    EmitNotification { title: String, body: String },
    /// Write the connection settings to the settings store
    PersistSettings { data: UserSettings },
}

impl Effect {
    fn notification(title: &str, body: &str) -> Self {
        Effect::EmitNotification {
            title: title.to_string(),
            body: body.to_string(),
        }
    }
}

/// Fold one raw signal into the state
pub fn reduce(
    previous: &SystemState,
    raw_signal: &str,
    now: DateTime<Utc>,
    notifications_granted: bool,
) -> (SystemState, Vec<Effect>) {
    let signal = decode(raw_signal);
    let code = signal.code;
    let class = side_effect_class(code);
    let is_transition = previous.status != code;

    let connection_error = connection_error(code, signal.detail.as_deref(), raw_signal);

    let mut effects = Vec::new();

    if class == SideEffectClass::Success && is_transition {
        match &previous.settings {
            Some(settings) => effects.push(Effect::PersistSettings {
                data: settings.clone(),
            }),
            None => tracing::debug!("Connected without submitted settings, nothing to persist"),
        }
    }

    if notifications_granted && is_transition {
        if let Some(notification) = notification(code, class, connection_error.as_deref()) {
            effects.push(notification);
        }
    }

    let mut next = previous.with_connection_error(connection_error);
    next.status = code;
    next.display_info = lookup(code);
    next.history = previous.history.append(code, now);

    tracing::debug!(
        "Reduced signal {:?} -> {} ({} effect(s))",
        raw_signal,
        code,
        effects.len()
    );

    (next, effects)
}

/// Fold the completion of a settings write into the state
pub fn apply_persist_outcome(
    previous: &SystemState,
    outcome: &Result<(), String>,
) -> SystemState {
    match outcome {
        Ok(()) => previous.with_settings_error(None),
        Err(e) => previous.with_settings_error(Some(e.clone())),
    }
}

/// User-facing error message for a status, if any
pub fn connection_error(code: StatusCode, detail: Option<&str>, raw_signal: &str) -> Option<String> {
    match code {
        StatusCode::Denied => Some(DENIED_MESSAGE.to_string()),
        StatusCode::Unreachable => Some(UNREACHABLE_MESSAGE.to_string()),
        StatusCode::BadConfig => Some(with_detail("Invalid parameter(s)", detail)),
        StatusCode::Error => Some(with_detail("System Error", detail)),
        StatusCode::Unknown => Some(format!(
            "Unknown Error: {}",
            detail.unwrap_or_else(|| raw_signal.trim())
        )),
        StatusCode::Disconnected
        | StatusCode::Connecting
        | StatusCode::Connected
        | StatusCode::Retrying
        | StatusCode::Dropped => None,
    }
}

fn with_detail(prefix: &str, detail: Option<&str>) -> String {
    match detail {
        Some(detail) => format!("{}: {}", prefix, detail),
        None => prefix.to_string(),
    }
}

fn notification(
    code: StatusCode,
    class: SideEffectClass,
    connection_error: Option<&str>,
) -> Option<Effect> {
    if class == SideEffectClass::Success {
        return Some(Effect::notification("SUCCESS", "SSH Connected!"));
    }

    match code {
        StatusCode::Dropped => Some(Effect::notification("ERROR", "SSH Connection Dropped!")),
        StatusCode::Retrying => Some(Effect::notification(
            "INTERRUPTION",
            "SSH Connection Interrupted!",
        )),
        StatusCode::Denied | StatusCode::Unreachable => {
            connection_error.map(|body| Effect::notification("ERROR", body))
        }
        _ => None,
    }
}
