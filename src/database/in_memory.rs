//! Transactional in-memory `user_logins` table.
//!
//! Enforces the primary key on `user_id` and applies batches against a
//! staging copy that only replaces the table when every insert succeeded.
//! Extra constraints can be attached to simulate check violations.

use super::{ConflictPolicy, LoginSink};
use crate::error::{PipelineError, PipelineResult};
use crate::models::PersistedLogin;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

type Constraint = Arc<dyn Fn(&PersistedLogin) -> Result<(), String> + Send + Sync>;

#[derive(Default)]
struct StoreState {
    rows: BTreeMap<String, PersistedLogin>,
    commits: u64,
    pending_failure: Option<String>,
}

/// In-memory `LoginSink` with real all-or-nothing semantics
pub struct InMemoryLoginStore {
    state: Mutex<StoreState>,
    conflict_policy: ConflictPolicy,
    constraints: Vec<(String, Constraint)>,
}

impl fmt::Debug for InMemoryLoginStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("InMemoryLoginStore")
            .field("rows", &state.rows.len())
            .field("commits", &state.commits)
            .field("conflict_policy", &self.conflict_policy)
            .field(
                "constraints",
                &self.constraints.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Default for InMemoryLoginStore {
    fn default() -> Self {
        Self::new(ConflictPolicy::default())
    }
}

impl InMemoryLoginStore {
    pub fn new(conflict_policy: ConflictPolicy) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            conflict_policy,
            constraints: Vec::new(),
        }
    }

    /// Attach a named row constraint checked on every insert
    pub fn with_constraint<F>(mut self, name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&PersistedLogin) -> Result<(), String> + Send + Sync + 'static,
    {
        self.constraints.push((name.into(), Arc::new(check)));
        self
    }

    /// Make the next persist fail before any row is written
    pub fn fail_next_persist(&self, message: impl Into<String>) {
        self.state.lock().pending_failure = Some(message.into());
    }

    pub fn get(&self, user_id: &str) -> Option<PersistedLogin> {
        self.state.lock().rows.get(user_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every committed row, ordered by `user_id`
    pub fn rows(&self) -> Vec<PersistedLogin> {
        self.state.lock().rows.values().cloned().collect()
    }

    /// Number of successfully committed batches
    pub fn commits(&self) -> u64 {
        self.state.lock().commits
    }

    fn check_constraints(&self, login: &PersistedLogin) -> PipelineResult<()> {
        for (name, check) in &self.constraints {
            check(login).map_err(|reason| {
                PipelineError::persistence(
                    "check_violation",
                    format!("constraint {name} rejected user_id {}: {reason}", login.user_id),
                )
            })?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl LoginSink for InMemoryLoginStore {
    async fn persist(&self, batch: &[PersistedLogin]) -> PipelineResult<u64> {
        if batch.is_empty() {
            return Ok(0);
        }

        let mut state = self.state.lock();
        if let Some(message) = state.pending_failure.take() {
            return Err(PipelineError::persistence("begin", message));
        }

        let mut staged = state.rows.clone();
        let mut inserted = 0;

        for login in batch {
            self.check_constraints(login)?;

            if staged.contains_key(&login.user_id) {
                match self.conflict_policy {
                    ConflictPolicy::Reject => {
                        return Err(PipelineError::persistence(
                            "unique_violation",
                            format!("duplicate key value violates primary key: user_id={}", login.user_id),
                        ));
                    }
                    ConflictPolicy::SkipExisting => continue,
                }
            }

            staged.insert(login.user_id.clone(), login.clone());
            inserted += 1;
        }

        state.rows = staged;
        state.commits += 1;

        debug!(inserted, batch_size = batch.len(), "Committed batch to in-memory store");
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::digest;
    use chrono::NaiveDate;

    fn login(user_id: &str) -> PersistedLogin {
        PersistedLogin {
            user_id: user_id.to_string(),
            device_type: "ios".to_string(),
            masked_ip: digest(b"1.2.3.4"),
            masked_device_id: digest(user_id.as_bytes()),
            locale: "en-US".to_string(),
            app_version: 210,
            create_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_key_rolls_back_batch() {
        let store = InMemoryLoginStore::new(ConflictPolicy::Reject);
        store.persist(&[login("u1")]).await.unwrap();

        let err = store
            .persist(&[login("u2"), login("u1"), login("u3")])
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Persistence { ref operation, .. } if operation == "unique_violation"));

        assert_eq!(store.len(), 1);
        assert!(store.get("u2").is_none());
        assert_eq!(store.commits(), 1);
    }

    #[tokio::test]
    async fn test_skip_existing_keeps_original_row() {
        let store = InMemoryLoginStore::new(ConflictPolicy::SkipExisting);
        store.persist(&[login("u1")]).await.unwrap();

        let mut changed = login("u1");
        changed.locale = "fr-FR".to_string();
        let inserted = store.persist(&[changed, login("u2")]).await.unwrap();

        assert_eq!(inserted, 1);
        assert_eq!(store.get("u1").unwrap().locale, "en-US");
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_constraint_violation_rolls_back() {
        let store = InMemoryLoginStore::default().with_constraint("locale_length", |l| {
            if l.locale.len() <= 5 {
                Ok(())
            } else {
                Err("value too long".to_string())
            }
        });

        let mut bad = login("u3");
        bad.locale = "en-US-POSIX".to_string();
        let result = store.persist(&[login("u1"), login("u2"), bad]).await;

        assert!(result.is_err());
        assert!(store.is_empty());
        assert_eq!(store.commits(), 0);
    }

    #[tokio::test]
    async fn test_injected_failure_writes_nothing() {
        let store = InMemoryLoginStore::default();
        store.fail_next_persist("connection reset");
        assert!(store.persist(&[login("u1")]).await.is_err());
        assert!(store.is_empty());

        store.persist(&[login("u1")]).await.unwrap();
        assert_eq!(store.len(), 1);
    }
}
