// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SSH Tunnel Status Contributors

//! Subscription manager
//!
//! Owns the lifetime of the signal subscription and is the only writer of
//! [`SystemState`]. One session runs between [`SubscriptionManager::start`] and
//! [`SubscriptionManager::stop`]:
//!
//! ```text
//! SignalChannel ──► pump task ──► reduce ──► watch (Arc<SystemState>) ──► observers
//!                      ▲              │
//!                      │              └──► EffectRunner ──► notifications
//!                      └─── persist completions ◄──────────┘   settings writes
//! ```
//!
//! The pump handles its inputs one at a time, so `reduce` never runs concurrently with
//! itself and signals are processed in delivery order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tunnel_status_common::{Error, Result, StatusCode, UserSettings, DEFAULT_CHANNEL};
use uuid::Uuid;

use crate::channel::{ListenerId, SignalChannel};
use crate::commands::{TunnelCommand, TunnelController};
use crate::effects::{EffectRunner, PersistCompletion};
use crate::reducer::{apply_persist_outcome, reduce};
use crate::state::SystemState;

/// Subscription lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Unsubscribed,
    Subscribed,
}

/// Messages from the manager to the running pump
#[derive(Debug)]
enum Control {
    SetSettings(UserSettings),
    /// Settings failed validation; fold them in as a `BAD_CONFIG` signal
    Reject(String),
}

struct Session {
    id: Uuid,
    listener: ListenerId,
    cancel: CancellationToken,
    control: mpsc::UnboundedSender<Control>,
    pump: JoinHandle<()>,
}

enum Lifecycle {
    Unsubscribed,
    Subscribed(Session),
}

/// Owns the signal subscription and publishes status snapshots
pub struct SubscriptionManager {
    channel: Arc<dyn SignalChannel>,
    controller: Arc<dyn TunnelController>,
    runner: EffectRunner,
    event: String,
    notifications_granted: Arc<AtomicBool>,
    state_tx: Arc<watch::Sender<Arc<SystemState>>>,
    lifecycle: Mutex<Lifecycle>,
}

impl SubscriptionManager {
    pub fn new(
        channel: Arc<dyn SignalChannel>,
        controller: Arc<dyn TunnelController>,
        runner: EffectRunner,
    ) -> Self {
        let (state_tx, _) = watch::channel(Arc::new(SystemState::new(Utc::now())));
        Self {
            channel,
            controller,
            runner,
            event: DEFAULT_CHANNEL.to_string(),
            notifications_granted: Arc::new(AtomicBool::new(false)),
            state_tx: Arc::new(state_tx),
            lifecycle: Mutex::new(Lifecycle::Unsubscribed),
        }
    }

    /// Listen on a different event name
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = event.into();
        self
    }

    /// Set the initial notification permission
    pub fn with_notifications_granted(self, granted: bool) -> Self {
        self.set_notifications_granted(granted);
        self
    }

    /// Update the notification permission; applies from the next signal on
    pub fn set_notifications_granted(&self, granted: bool) {
        self.notifications_granted.store(granted, Ordering::Release);
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    /// Start a session: register the listener and spawn the pump
    ///
    /// Does nothing if a session is already running.
    pub async fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        if let Lifecycle::Subscribed(session) = &*lifecycle {
            warn!(
                "Already subscribed to '{}' (session {}), ignoring start",
                self.event, session.id
            );
            return Ok(());
        }

        let listener = self.channel.listen(&self.event).await?;

        let session_id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        self.state_tx
            .send_replace(Arc::new(SystemState::new(Utc::now())));

        let pump = Pump {
            session: session_id,
            state_tx: self.state_tx.clone(),
            runner: self.runner.for_session(),
            notifications_granted: self.notifications_granted.clone(),
            cancel: cancel.clone(),
        };
        let handle = tokio::spawn(pump.run(listener.receiver, control_rx));

        *lifecycle = Lifecycle::Subscribed(Session {
            id: session_id,
            listener: listener.id,
            cancel,
            control: control_tx,
            pump: handle,
        });

        info!("Subscribed to '{}' (session {})", self.event, session_id);
        Ok(())
    }

    /// End the session: stop processing, deregister the listener and join the pump
    ///
    /// Safe to call any number of times. The last published snapshot stays readable.
    pub async fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        let Lifecycle::Subscribed(session) =
            std::mem::replace(&mut *lifecycle, Lifecycle::Unsubscribed)
        else {
            debug!("Not subscribed to '{}', nothing to stop", self.event);
            return;
        };

        // Cancel first so anything still queued on the listener is discarded
        session.cancel.cancel();

        if let Err(e) = self.channel.unlisten(session.listener).await {
            warn!("Failed to deregister listener on '{}': {}", self.event, e);
        }

        if let Err(e) = session.pump.await {
            warn!("Status pump for session {} ended abnormally: {}", session.id, e);
        }

        info!("Unsubscribed from '{}' (session {})", self.event, session.id);
    }

    /// Current lifecycle state
    pub async fn state(&self) -> SubscriptionState {
        match &*self.lifecycle.lock().await {
            Lifecycle::Unsubscribed => SubscriptionState::Unsubscribed,
            Lifecycle::Subscribed(_) => SubscriptionState::Subscribed,
        }
    }

    /// Id of the running session, if any
    pub async fn session_id(&self) -> Option<Uuid> {
        match &*self.lifecycle.lock().await {
            Lifecycle::Unsubscribed => None,
            Lifecycle::Subscribed(session) => Some(session.id),
        }
    }

    /// Watch the published snapshots
    pub fn subscribe(&self) -> watch::Receiver<Arc<SystemState>> {
        self.state_tx.subscribe()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<SystemState> {
        self.state_tx.borrow().clone()
    }

    /// Record the connection settings for this session and ask the supervisor to connect
    ///
    /// Settings that fail validation are not sent. They surface in the state as a
    /// `BAD_CONFIG` status instead, the same way the supervisor reports them.
    pub async fn connect(&self, settings: UserSettings) -> Result<()> {
        let payload = {
            let lifecycle = self.lifecycle.lock().await;
            let Lifecycle::Subscribed(session) = &*lifecycle else {
                return Err(Error::Channel(format!(
                    "Not subscribed to '{}', start the session first",
                    self.event
                )));
            };

            let (message, payload) = match settings.to_start_payload() {
                Ok(payload) => (Control::SetSettings(settings), Some(payload)),
                Err(e) => {
                    let reason = match e {
                        Error::Config(reason) => reason,
                        other => other.to_string(),
                    };
                    warn!("Rejected connection settings: {}", reason);
                    (Control::Reject(reason), None)
                }
            };

            session
                .control
                .send(message)
                .map_err(|_| Error::Channel("Status pump is not running".to_string()))?;
            payload
        };

        match payload {
            Some(settings) => {
                self.controller
                    .send(TunnelCommand::StartTunnel { settings })
                    .await
            }
            None => Ok(()),
        }
    }

    /// Ask the supervisor to tear the tunnel down
    pub async fn disconnect(&self) -> Result<()> {
        self.controller.send(TunnelCommand::EndTunnel).await
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        if let Lifecycle::Subscribed(session) = self.lifecycle.get_mut() {
            debug!("Manager dropped while subscribed, cancelling session {}", session.id);
            session.cancel.cancel();
        }
    }
}

/// Per-session task state
struct Pump {
    session: Uuid,
    state_tx: Arc<watch::Sender<Arc<SystemState>>>,
    runner: EffectRunner,
    notifications_granted: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl Pump {
    async fn run(
        self,
        mut signals: mpsc::UnboundedReceiver<String>,
        mut control: mpsc::UnboundedReceiver<Control>,
    ) {
        let (completions_tx, mut completions) = mpsc::unbounded_channel();
        let mut signals_open = true;

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break,

                Some(message) = control.recv() => self.handle_control(message, &completions_tx),

                Some(completion) = completions.recv() => self.handle_completion(completion),

                raw = signals.recv(), if signals_open => match raw {
                    Some(raw) => self.handle_signal(&raw, &completions_tx),
                    None => {
                        debug!("Signal channel closed for session {}", self.session);
                        signals_open = false;
                    }
                },
            }
        }

        debug!("Status pump for session {} stopped", self.session);
    }

    fn handle_signal(&self, raw: &str, completions: &mpsc::UnboundedSender<PersistCompletion>) {
        if self.cancel.is_cancelled() {
            debug!("Discarding signal {:?} received during teardown", raw);
            return;
        }

        let previous = self.state_tx.borrow().clone();
        let granted = self.notifications_granted.load(Ordering::Acquire);
        let (next, effects) = reduce(&previous, raw, Utc::now(), granted);

        if next.status != previous.status {
            info!("Tunnel status: {} -> {}", previous.status, next.status);
        }

        self.state_tx.send_replace(Arc::new(next));
        self.runner.run(effects, self.session, completions);
    }

    fn handle_completion(&self, completion: PersistCompletion) {
        if self.cancel.is_cancelled() || completion.session != self.session {
            debug!("Discarding stale settings write completion");
            return;
        }

        self.state_tx.send_modify(|state| {
            let next = apply_persist_outcome(state.as_ref(), &completion.outcome);
            *state = Arc::new(next);
        });
    }

    fn handle_control(
        &self,
        message: Control,
        completions: &mpsc::UnboundedSender<PersistCompletion>,
    ) {
        match message {
            Control::SetSettings(settings) => {
                debug!("Settings submitted for {}@{}", settings.user, settings.host);
                self.state_tx.send_modify(|state| {
                    let next = state.with_settings(settings);
                    *state = Arc::new(next);
                });
            }
            Control::Reject(reason) => {
                let raw = format!("{}: {}", StatusCode::BadConfig.token(), reason);
                self.handle_signal(&raw, completions);
            }
        }
    }
}
