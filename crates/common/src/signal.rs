// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SSH Tunnel Status Contributors

//! Decoder for raw status signals emitted by the tunnel supervisor
//!
//! Signals are plain strings. Three shapes are accepted:
//!
//! - a bare token: `CONNECTED`
//! - a token and a detail separated by a colon: `ERROR: child process exited`
//! - the legacy fixed-offset form, where the detail of a failure token starts one
//!   separator character after the token: `BAD_CONFIG Illegal port value`
//!
//! Decoding never fails. Anything unrecognised becomes [`StatusCode::Unknown`].

use serde::Serialize;

use crate::types::StatusCode;

/// Tokens older supervisors emit for the disconnected state
const LEGACY_ALIASES: [(&str, StatusCode); 2] = [
    ("READY", StatusCode::Disconnected),
    ("EXIT", StatusCode::Disconnected),
];

/// A raw signal split into its status code and optional detail message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedSignal {
    pub code: StatusCode,
    pub detail: Option<String>,
}

impl DecodedSignal {
    fn new(code: StatusCode, detail: Option<&str>) -> Self {
        Self {
            code,
            detail: detail.filter(|d| !d.is_empty()).map(str::to_string),
        }
    }
}

/// Resolve a token (or legacy alias) to its status code
pub fn parse_token(token: &str) -> Option<StatusCode> {
    StatusCode::ALL
        .into_iter()
        .find(|code| code.token() == token)
        .or_else(|| {
            LEGACY_ALIASES
                .iter()
                .find(|(alias, _)| *alias == token)
                .map(|(_, code)| *code)
        })
}

/// Decode a raw signal into a status code and optional detail
pub fn decode(raw: &str) -> DecodedSignal {
    let signal = raw.trim();

    if signal.is_empty() {
        return DecodedSignal::new(StatusCode::Unknown, None);
    }

    if let Some(code) = parse_token(signal) {
        return DecodedSignal::new(code, None);
    }

    if let Some(decoded) = decode_colon_form(signal) {
        return decoded;
    }

    if let Some(decoded) = decode_legacy_form(signal) {
        tracing::debug!("Decoded legacy fixed-offset signal: {:?}", signal);
        return decoded;
    }

    tracing::debug!("Unrecognised signal: {:?}", signal);
    DecodedSignal::new(StatusCode::Unknown, Some(signal))
}

/// `"<TOKEN>: <detail>"`
fn decode_colon_form(signal: &str) -> Option<DecodedSignal> {
    let (prefix, detail) = signal.split_once(':')?;
    let code = parse_token(prefix.trim())?;
    Some(DecodedSignal::new(code, Some(detail.trim_start())))
}

/// `"<TOKEN><sep><detail>"` where the detail starts at a fixed offset past the token
fn decode_legacy_form(signal: &str) -> Option<DecodedSignal> {
    StatusCode::ALL
        .into_iter()
        .filter(StatusCode::carries_detail)
        .find_map(|code| {
            let rest = signal.strip_prefix(code.token())?;
            let separator = rest.chars().next()?;
            if separator.is_alphanumeric() || separator == '_' {
                return None;
            }
            let offset = code.token().len() + separator.len_utf8();
            Some(DecodedSignal::new(code, Some(signal[offset..].trim_start())))
        })
}
