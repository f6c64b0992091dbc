// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SSH Tunnel Status Contributors

// SSH Tunnel Status - Common Library
// Status model, signal decoding, status registry and configuration

pub mod config;
pub mod error;
pub mod registry;
pub mod signal;
pub mod types;

pub use config::{
    default_settings_path, EngineConfig, StartTunnelPayload, UserSettings, DEFAULT_CHANNEL,
    SETTINGS_FILE_NAME,
};
pub use error::{Error, Result};
pub use registry::{lookup, side_effect_class};
pub use signal::{decode, parse_token, DecodedSignal};
pub use types::{DisplayInfo, HistoryEntry, IconKind, SideEffectClass, StatusCode};

// Re-export commonly used external types
pub use chrono::{DateTime, Utc};
