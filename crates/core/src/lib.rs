// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SSH Tunnel Status Contributors

//! Connection-status synchronization core for SSH Tunnel Status
//!
//! Consumes raw status signals from the tunnel supervisor, folds them into an immutable
//! [`SystemState`] and runs the resulting side effects (settings persistence, user
//! notifications). UI front ends observe the state through [`SubscriptionManager::subscribe`].

pub mod channel;
pub mod commands;
pub mod effects;
pub mod history;
pub mod reducer;
pub mod state;
pub mod subscription;

// Re-export commonly used types
pub use channel::{Listener, ListenerId, LocalChannel, SignalChannel};
pub use commands::{LoggingController, TunnelCommand, TunnelController, END_TUNNEL, START_TUNNEL};
pub use effects::{
    EffectRunner, JsonFileStore, NotificationSink, NullNotifier, PersistCompletion, PersistGuard,
    SettingsStore,
};
pub use history::History;
pub use reducer::{apply_persist_outcome, reduce, Effect};
pub use state::{ErrorSource, SystemState};
pub use subscription::{SubscriptionManager, SubscriptionState};

// Re-export types from common crate for convenience
pub use tunnel_status_common::{
    decode, lookup, side_effect_class, DecodedSignal, DisplayInfo, HistoryEntry, IconKind,
    SideEffectClass, StatusCode, UserSettings,
};
