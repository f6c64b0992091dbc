// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SSH Tunnel Status Contributors

//! Inbound signal channel

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tunnel_status_common::{Error, Result};

/// Handle identifying one registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A registered listener: its id and the stream of raw signals delivered to it
#[derive(Debug)]
pub struct Listener {
    pub id: ListenerId,
    pub receiver: mpsc::UnboundedReceiver<String>,
}

/// Named event channel carrying raw status signals from the supervisor
#[async_trait]
pub trait SignalChannel: Send + Sync {
    /// Register a listener for `event`
    async fn listen(&self, event: &str) -> Result<Listener>;

    /// Deregister a listener
    async fn unlisten(&self, id: ListenerId) -> Result<()>;
}

#[derive(Debug, Default)]
struct Hub {
    next_id: u64,
    listeners: HashMap<ListenerId, (String, mpsc::UnboundedSender<String>)>,
}

/// In-process channel: fans emitted payloads out to every listener of the event
#[derive(Debug, Clone, Default)]
pub struct LocalChannel {
    hub: Arc<Mutex<Hub>>,
}

impl LocalChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn hub(&self) -> MutexGuard<'_, Hub> {
        self.hub.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Deliver a payload to every listener of `event`, returning how many received it
    pub fn emit(&self, event: &str, payload: impl Into<String>) -> usize {
        let payload = payload.into();
        let mut hub = self.hub();
        let mut delivered = 0;

        // Listeners whose receiver is gone are pruned
        hub.listeners.retain(|_, (name, tx)| {
            if name != event {
                return true;
            }
            match tx.send(payload.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => false,
            }
        });

        tracing::trace!("Emitted {:?} on {} to {} listener(s)", payload, event, delivered);
        delivered
    }

    /// Number of listeners registered for `event`
    pub fn listener_count(&self, event: &str) -> usize {
        self.hub()
            .listeners
            .values()
            .filter(|(name, _)| name == event)
            .count()
    }
}

#[async_trait]
impl SignalChannel for LocalChannel {
    async fn listen(&self, event: &str) -> Result<Listener> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut hub = self.hub();
        let id = ListenerId(hub.next_id);
        hub.next_id += 1;
        hub.listeners.insert(id, (event.to_string(), tx));
        Ok(Listener { id, receiver: rx })
    }

    async fn unlisten(&self, id: ListenerId) -> Result<()> {
        match self.hub().listeners.remove(&id) {
            Some(_) => Ok(()),
            None => Err(Error::Channel(format!("Listener {:?} is not registered", id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_reaches_matching_listeners_only() {
        let channel = LocalChannel::new();
        let mut status = channel.listen("tunnel_status").await.unwrap();
        let mut other = channel.listen("other").await.unwrap();

        assert_eq!(channel.emit("tunnel_status", "CONNECTED"), 1);
        assert_eq!(status.receiver.recv().await.as_deref(), Some("CONNECTED"));
        assert!(other.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unlisten() {
        let channel = LocalChannel::new();
        let listener = channel.listen("tunnel_status").await.unwrap();
        assert_eq!(channel.listener_count("tunnel_status"), 1);

        channel.unlisten(listener.id).await.unwrap();
        assert_eq!(channel.listener_count("tunnel_status"), 0);
        assert_eq!(channel.emit("tunnel_status", "CONNECTED"), 0);

        // Second deregistration is reported
        assert!(channel.unlisten(listener.id).await.is_err());
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_pruned() {
        let channel = LocalChannel::new();
        let listener = channel.listen("tunnel_status").await.unwrap();
        drop(listener);

        assert_eq!(channel.emit("tunnel_status", "CONNECTED"), 0);
        assert_eq!(channel.listener_count("tunnel_status"), 0);
    }
}
