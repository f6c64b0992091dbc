// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 SSH Tunnel Status Contributors

//! Effect execution: settings persistence and user notifications

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use tunnel_status_common::{Error, Result, UserSettings};
use uuid::Uuid;

use crate::reducer::Effect;

/// Destination for user notifications
///
/// Delivery is best effort. Errors are logged by the runner and otherwise ignored.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, title: &str, body: &str) -> Result<()>;
}

/// Notification sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl NotificationSink for NullNotifier {
    fn notify(&self, _title: &str, _body: &str) -> Result<()> {
        Ok(())
    }
}

/// Storage for the user's connection settings
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Read the stored settings, `None` if nothing was saved yet
    async fn load(&self) -> Result<Option<UserSettings>>;

    /// Replace the stored settings
    async fn save(&self, settings: &UserSettings) -> Result<()>;
}

/// Settings stored as a flat JSON object in a single file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SettingsStore for JsonFileStore {
    async fn load(&self) -> Result<Option<UserSettings>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No saved settings at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(None);
        }

        let settings = serde_json::from_str(&contents).map_err(|e| {
            Error::Settings(format!("Failed to parse {}: {}", self.path.display(), e))
        })?;
        Ok(Some(settings))
    }

    async fn save(&self, settings: &UserSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let contents = serde_json::to_string(settings)?;

        // Write next to the target and rename so readers never see a partial file
        let tmp_path = self
            .path
            .with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));
        tokio::fs::write(&tmp_path, contents).await.map_err(|e| {
            Error::Settings(format!("Failed to write {}: {}", tmp_path.display(), e))
        })?;
        tokio::fs::rename(&tmp_path, &self.path).await.map_err(|e| {
            Error::Settings(format!("Failed to write {}: {}", self.path.display(), e))
        })?;

        debug!("Saved settings to {}", self.path.display());
        Ok(())
    }
}

/// In-flight flag for settings writes
///
/// At most one write may be outstanding. The flag is claimed with a compare-exchange and
/// released when the returned [`PersistTicket`] is dropped.
#[derive(Debug, Clone, Default)]
pub struct PersistGuard {
    in_flight: Arc<AtomicBool>,
}

/// Proof that the holder owns the in-flight slot
#[derive(Debug)]
pub struct PersistTicket {
    in_flight: Arc<AtomicBool>,
}

impl PersistGuard {
    /// Claim the in-flight slot, `None` if a write is already running
    pub fn try_acquire(&self) -> Option<PersistTicket> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PersistTicket {
                in_flight: self.in_flight.clone(),
            })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

impl Drop for PersistTicket {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

/// Completion report of a settings write, tagged with the session that scheduled it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistCompletion {
    pub session: Uuid,
    pub outcome: std::result::Result<(), String>,
}

/// Executes the effects produced by the reducer
#[derive(Clone)]
pub struct EffectRunner {
    store: Arc<dyn SettingsStore>,
    notifier: Arc<dyn NotificationSink>,
    guard: PersistGuard,
}

impl EffectRunner {
    pub fn new(store: Arc<dyn SettingsStore>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            store,
            notifier,
            guard: PersistGuard::default(),
        }
    }

    /// Runner sharing the store and notifier but with its own in-flight guard
    ///
    /// A write left over from an earlier session does not block the next one.
    pub fn for_session(&self) -> Self {
        Self {
            store: self.store.clone(),
            notifier: self.notifier.clone(),
            guard: PersistGuard::default(),
        }
    }

    pub fn guard(&self) -> &PersistGuard {
        &self.guard
    }

    /// Run effects in order
    ///
    /// Settings writes are spawned; their completion is sent on `completions`.
    pub fn run(
        &self,
        effects: Vec<Effect>,
        session: Uuid,
        completions: &mpsc::UnboundedSender<PersistCompletion>,
    ) {
        for effect in effects {
            match effect {
                Effect::PersistSettings { data } => {
                    self.persist(data, session, completions.clone());
                }
                Effect::EmitNotification { title, body } => self.notify(&title, &body),
            }
        }
    }

    fn persist(
        &self,
        settings: UserSettings,
        session: Uuid,
        completions: mpsc::UnboundedSender<PersistCompletion>,
    ) {
        let Some(ticket) = self.guard.try_acquire() else {
            warn!("Settings write already in flight, skipping");
            return;
        };

        let store = self.store.clone();
        tokio::spawn(async move {
            let outcome = store.save(&settings).await.map_err(|e| {
                warn!("Failed to save settings: {}", e);
                e.to_string()
            });
            drop(ticket);

            if completions
                .send(PersistCompletion { session, outcome })
                .is_err()
            {
                debug!("Session {} ended before settings write completed", session);
            }
        });
    }

    fn notify(&self, title: &str, body: &str) {
        if let Err(e) = self.notifier.notify(title, body) {
            debug!("Notification dropped: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> UserSettings {
        UserSettings {
            host: "db.example.com".to_string(),
            user: "ops".to_string(),
            port: "6543".to_string(),
            key_path: "~/.ssh/ops".to_string(),
        }
    }

    #[test]
    fn test_guard_is_exclusive() {
        let guard = PersistGuard::default();
        let ticket = guard.try_acquire().expect("first claim");
        assert!(guard.is_in_flight());
        assert!(guard.try_acquire().is_none());

        drop(ticket);
        assert!(!guard.is_in_flight());
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn test_guard_clones_share_state() {
        let guard = PersistGuard::default();
        let other = guard.clone();
        let _ticket = guard.try_acquire().unwrap();
        assert!(other.try_acquire().is_none());
    }

    #[test]
    fn test_session_runner_has_its_own_guard() {
        let store = Arc::new(JsonFileStore::new("unused.json"));
        let runner = EffectRunner::new(store, Arc::new(NullNotifier));
        let _ticket = runner.guard().try_acquire().unwrap();

        let next = runner.for_session();
        assert!(!next.guard().is_in_flight());
        assert!(next.guard().try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("settings.json"));

        assert_eq!(store.load().await.unwrap(), None);

        store.save(&settings()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(settings()));

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"keyPath\""));
    }

    #[tokio::test]
    async fn test_file_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();

        let err = JsonFileStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, Error::Settings(_)));
    }

    #[tokio::test]
    async fn test_runner_reports_completion() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path().join("settings.json")));
        let runner = EffectRunner::new(store.clone(), Arc::new(NullNotifier));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Uuid::new_v4();

        runner.run(
            vec![Effect::PersistSettings { data: settings() }],
            session,
            &tx,
        );

        let completion = rx.recv().await.unwrap();
        assert_eq!(
            completion,
            PersistCompletion {
                session,
                outcome: Ok(())
            }
        );
        assert!(!runner.guard().is_in_flight());
        assert_eq!(store.load().await.unwrap(), Some(settings()));
    }
}
