// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SSH Tunnel Status Contributors

//! Outbound commands to the tunnel supervisor
//!
//! Both commands are fire-and-forget. Their effect is only ever observed through the
//! inbound signal channel.

use async_trait::async_trait;
use serde::Serialize;
use tunnel_status_common::{Result, StartTunnelPayload};

/// Command name understood by the supervisor to bring a tunnel up
pub const START_TUNNEL: &str = "start_tunnel";

/// Command name understood by the supervisor to tear the tunnel down
pub const END_TUNNEL: &str = "end_tunnel";

/// Command sent to the supervisor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum TunnelCommand {
    StartTunnel { settings: StartTunnelPayload },
    EndTunnel,
}

impl TunnelCommand {
    pub fn name(&self) -> &'static str {
        match self {
            TunnelCommand::StartTunnel { .. } => START_TUNNEL,
            TunnelCommand::EndTunnel => END_TUNNEL,
        }
    }
}

/// Transport for outbound supervisor commands
#[async_trait]
pub trait TunnelController: Send + Sync {
    async fn send(&self, command: TunnelCommand) -> Result<()>;
}

/// Controller that only logs the commands it receives
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingController;

#[async_trait]
impl TunnelController for LoggingController {
    async fn send(&self, command: TunnelCommand) -> Result<()> {
        match &command {
            TunnelCommand::StartTunnel { settings } => tracing::info!(
                "{}: {}@{} (local port {}, key {})",
                command.name(),
                settings.user,
                settings.host,
                settings.port,
                settings.key_path
            ),
            TunnelCommand::EndTunnel => tracing::info!("{}", command.name()),
        }
        Ok(())
    }
}
