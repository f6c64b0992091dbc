// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SSH Tunnel Status Contributors

// Desktop notifications for tunnel status changes

use notify_rust::{Notification, Timeout};
use tunnel_status_common::{Error, Result};
use tunnel_status_core::NotificationSink;

/// Shows notifications through the desktop notification daemon
///
/// Inside a tokio runtime the D-Bus call runs on the blocking pool and failures are only
/// logged, so a slow daemon never holds up status processing.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

impl DesktopNotifier {
    fn icon(title: &str) -> &'static str {
        match title {
            "SUCCESS" => "network-transmit-receive",
            "INTERRUPTION" => "network-error",
            _ => "dialog-error",
        }
    }

    fn timeout(title: &str) -> Timeout {
        match title {
            "SUCCESS" => Timeout::Milliseconds(3000),
            _ => Timeout::Milliseconds(10000),
        }
    }

    fn build(title: &str, body: &str) -> Notification {
        let mut notification = Notification::new();
        notification
            .summary(title)
            .body(body)
            .icon(Self::icon(title))
            .timeout(Self::timeout(title));
        notification
    }
}

fn show(notification: &Notification) -> Result<()> {
    notification
        .show()
        .map(|_| ())
        .map_err(|e| Error::Notification(e.to_string()))
}

impl NotificationSink for DesktopNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        let notification = Self::build(title, body);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || {
                    if let Err(e) = show(&notification) {
                        tracing::debug!("Failed to show notification: {}", e);
                    }
                });
                Ok(())
            }
            Err(_) => show(&notification),
        }
    }
}
