//! ResetCoordinator - irreversible wipe of every data category.
//!
//! Categories are cleared one at a time, in [`VaultCategory::ALL`] order,
//! and each clear is awaited before the next starts. The security state is
//! cleared only after every category has been wiped. If the process dies
//! half-way, the remaining data is still reachable with the old PIN, and the
//! user is never locked out of data that was not actually wiped.
//!
//! A failed reset leaves its uncleared categories outstanding. A retry always
//! covers them, whatever the caller asks for, and a retry with nothing
//! outstanding wipes every category.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::auth::VaultCategory;
use super::error::{VaultError, VaultResult};
use super::state::SecurityState;
use crate::storage::VaultStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetStatus {
    Pending,
    Committed,
    Failed,
}

/// One reset request. Lives only for the duration of the wipe.
#[derive(Debug, Clone)]
pub struct ResetOperation {
    pub id: Uuid,
    pub targets: BTreeSet<VaultCategory>,
    pub started_at: DateTime<Utc>,
    pub status: ResetStatus,
}

impl ResetOperation {
    fn new(targets: BTreeSet<VaultCategory>) -> Self {
        Self {
            id: Uuid::new_v4(),
            targets,
            started_at: Utc::now(),
            status: ResetStatus::Pending,
        }
    }
}

/// Releases the in-flight flag on every exit path.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
pub struct ResetCoordinator {
    /// Guard against concurrent resets.
    /// Only one operation is pending at a time.
    in_progress: AtomicBool,
    /// Categories a failed reset could not clear. `None` when no failure is
    /// on record, in which case a retry wipes everything.
    outstanding: Mutex<Option<BTreeSet<VaultCategory>>>,
}

impl ResetCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    /// Wipe every category, then the security state.
    pub async fn reset_all(
        &self,
        store: &dyn VaultStore,
        state: &RwLock<SecurityState>,
    ) -> VaultResult<()> {
        self.reset(store, state, VaultCategory::ALL.into_iter().collect())
            .await
    }

    /// Retry a failed reset over `targets`, then clear the security state.
    ///
    /// `targets` is widened to the categories the last failed reset left
    /// behind. With no failure on record every category is wiped, so the
    /// security state never goes while another category still holds data.
    ///
    /// # Errors
    /// - `ResetInProgress` if another reset is pending
    /// - `ResetFailure { partial }` if some categories could not be cleared;
    ///   the security state is then left untouched
    /// - `Storage` if the cleared security state could not be persisted
    pub async fn reset(
        &self,
        store: &dyn VaultStore,
        state: &RwLock<SecurityState>,
        targets: BTreeSet<VaultCategory>,
    ) -> VaultResult<()> {
        let Some(_in_flight) = InFlight::acquire(&self.in_progress) else {
            debug!("Reset requested while another is pending");
            return Err(VaultError::ResetInProgress);
        };

        let mut outstanding = self.outstanding.lock().await;
        let targets = Self::effective_targets(targets, outstanding.as_ref());

        let mut operation = ResetOperation::new(targets);
        warn!(
            "Resetting vault - all data will be lost! (operation {}, {} categories)",
            operation.id,
            operation.targets.len()
        );

        let result = Self::run(&operation, store, state).await;
        *outstanding = match &result {
            Ok(()) => None,
            Err(VaultError::ResetFailure { partial }) => Some(partial.clone()),
            // Nothing reliable to narrow to; the next retry wipes everything
            Err(_) => None,
        };
        operation.status = match result {
            Ok(()) => ResetStatus::Committed,
            Err(_) => ResetStatus::Failed,
        };

        let elapsed = Utc::now().signed_duration_since(operation.started_at);
        match &result {
            Ok(()) => info!(
                "Reset {} committed in {} ms",
                operation.id,
                elapsed.num_milliseconds()
            ),
            Err(e) => warn!("Reset {} failed: {}", operation.id, e),
        }
        debug!("Reset {} finished with status {:?}", operation.id, operation.status);

        result
    }

    fn effective_targets(
        requested: BTreeSet<VaultCategory>,
        outstanding: Option<&BTreeSet<VaultCategory>>,
    ) -> BTreeSet<VaultCategory> {
        let Some(left) = outstanding else {
            if requested.len() < VaultCategory::ALL.len() {
                debug!("No failed reset on record, widening retry to every category");
            }
            return VaultCategory::ALL.into_iter().collect();
        };

        if !left.is_subset(&requested) {
            debug!(
                "Retry missing outstanding categories, widening to include: {:?}",
                left.difference(&requested).collect::<Vec<_>>()
            );
        }
        requested.union(left).copied().collect()
    }

    async fn run(
        operation: &ResetOperation,
        store: &dyn VaultStore,
        state: &RwLock<SecurityState>,
    ) -> VaultResult<()> {
        let mut partial = BTreeSet::new();

        // Keep going after a failure; cleared data cannot be restored anyway
        for &category in &operation.targets {
            match store.clear(category).await {
                Ok(()) => info!("Cleared {}", category),
                Err(e) => {
                    warn!("Failed to clear {}: {}", category, e);
                    partial.insert(category);
                }
            }
        }

        if !partial.is_empty() {
            return Err(VaultError::ResetFailure { partial });
        }

        // Security state goes last
        let mut security = state.write().await;
        store.save_security_state(&SecurityState::new()).await?;
        security.clear();
        info!("Cleared security state");

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::error::{StorageError, StorageResult};
    use crate::storage::MemoryVaultStore;
    use crate::vault::pin::tests::TEST_KDF;

    /// Memory store with injectable failures and latency.
    #[derive(Default)]
    pub(crate) struct TestStore {
        pub(crate) inner: MemoryVaultStore,
        pub(crate) failing: Mutex<HashSet<VaultCategory>>,
        pub(crate) fail_security_save: AtomicBool,
        pub(crate) clear_delay: Option<Duration>,
        pub(crate) clear_calls: Mutex<Vec<VaultCategory>>,
    }

    impl TestStore {
        pub(crate) fn slow(delay: Duration) -> Self {
            Self {
                clear_delay: Some(delay),
                ..Self::default()
            }
        }

        pub(crate) fn fail_on(&self, category: VaultCategory) {
            self.failing.lock().unwrap().insert(category);
        }

        pub(crate) fn heal(&self) {
            self.failing.lock().unwrap().clear();
        }

        pub(crate) async fn fill(&self) {
            for category in VaultCategory::ALL {
                self.inner.insert(category, json!({"category": category})).await;
            }
        }
    }

    #[async_trait]
    impl VaultStore for TestStore {
        async fn clear(&self, category: VaultCategory) -> StorageResult<()> {
            self.clear_calls.lock().unwrap().push(category);
            if let Some(delay) = self.clear_delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing.lock().unwrap().contains(&category) {
                return Err(StorageError::Backend(format!("{} is read-only", category)));
            }
            self.inner.clear(category).await
        }

        async fn load_security_state(&self) -> StorageResult<Option<SecurityState>> {
            self.inner.load_security_state().await
        }

        async fn save_security_state(&self, state: &SecurityState) -> StorageResult<()> {
            if self.fail_security_save.load(Ordering::SeqCst) {
                return Err(StorageError::Backend("security state is read-only".into()));
            }
            self.inner.save_security_state(state).await
        }
    }

    fn configured_state() -> RwLock<SecurityState> {
        let mut state = SecurityState::new();
        state.configure("1234", TEST_KDF).unwrap();
        RwLock::new(state)
    }

    #[tokio::test]
    async fn test_reset_all_clears_everything() {
        let store = TestStore::default();
        store.fill().await;
        let state = configured_state();
        let coordinator = ResetCoordinator::new();

        coordinator.reset_all(&store, &state).await.unwrap();

        for category in VaultCategory::ALL {
            assert!(store.inner.is_empty(category).await, "{} not empty", category);
        }
        assert!(!state.read().await.is_configured());
        assert!(!coordinator.is_in_progress());

        let persisted = store.inner.load_security_state().await.unwrap().unwrap();
        assert!(!persisted.is_configured());
    }

    #[tokio::test]
    async fn test_clears_in_fixed_order() {
        let store = TestStore::default();
        let state = configured_state();

        ResetCoordinator::new().reset_all(&store, &state).await.unwrap();
        assert_eq!(*store.clear_calls.lock().unwrap(), VaultCategory::ALL.to_vec());
    }

    #[tokio::test]
    async fn test_failed_category_reported_and_pin_kept() {
        let store = TestStore::default();
        store.fill().await;
        store.fail_on(VaultCategory::Notes);
        let state = configured_state();
        let coordinator = ResetCoordinator::new();

        let err = coordinator.reset_all(&store, &state).await.unwrap_err();
        match err {
            VaultError::ResetFailure { partial } => {
                assert_eq!(partial, BTreeSet::from([VaultCategory::Notes]));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        for category in VaultCategory::ALL {
            let empty = store.inner.is_empty(category).await;
            assert_eq!(empty, category != VaultCategory::Notes, "{}", category);
        }
        assert!(state.read().await.verify("1234"));
        assert!(!coordinator.is_in_progress(), "Flag must be released on failure");
    }

    #[tokio::test]
    async fn test_retry_partial_commits() {
        let store = TestStore::default();
        store.fill().await;
        store.fail_on(VaultCategory::Bugs);
        let state = configured_state();
        let coordinator = ResetCoordinator::new();

        let partial = match coordinator.reset_all(&store, &state).await {
            Err(VaultError::ResetFailure { partial }) => partial,
            other => panic!("unexpected result: {other:?}"),
        };

        store.heal();
        store.clear_calls.lock().unwrap().clear();
        coordinator.reset(&store, &state, partial).await.unwrap();

        assert_eq!(*store.clear_calls.lock().unwrap(), vec![VaultCategory::Bugs]);
        assert!(store.inner.is_empty(VaultCategory::Bugs).await);
        assert!(!state.read().await.is_configured());
    }

    #[tokio::test]
    async fn test_security_save_failure_keeps_pin() {
        let store = TestStore::default();
        store.fail_security_save.store(true, Ordering::SeqCst);
        let state = configured_state();

        let err = ResetCoordinator::new()
            .reset_all(&store, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::Storage(StorageError::Backend(_))));
        assert!(state.read().await.is_configured());
    }

    #[tokio::test]
    async fn test_concurrent_reset_rejected() {
        let store = TestStore::slow(Duration::from_millis(20));
        let state = configured_state();
        let coordinator = ResetCoordinator::new();

        let (first, second) = tokio::join!(
            coordinator.reset_all(&store, &state),
            coordinator.reset_all(&store, &state)
        );

        assert!(first.is_ok());
        assert!(matches!(second, Err(VaultError::ResetInProgress)));
        // Only one wipe ran
        assert_eq!(store.clear_calls.lock().unwrap().len(), VaultCategory::ALL.len());
    }

    #[tokio::test]
    async fn test_retry_without_failure_wipes_every_category() {
        let store = TestStore::default();
        store.fill().await;
        let state = configured_state();

        ResetCoordinator::new()
            .reset(&store, &state, BTreeSet::new())
            .await
            .unwrap();

        assert_eq!(*store.clear_calls.lock().unwrap(), VaultCategory::ALL.to_vec());
        for category in VaultCategory::ALL {
            assert!(store.inner.is_empty(category).await, "{} not empty", category);
        }
        assert!(!state.read().await.is_configured());
    }

    #[tokio::test]
    async fn test_retry_widened_to_outstanding_categories() {
        let store = TestStore::default();
        store.fill().await;
        store.fail_on(VaultCategory::Notes);
        let state = configured_state();
        let coordinator = ResetCoordinator::new();

        assert!(coordinator.reset_all(&store, &state).await.is_err());

        // Asking for a category that never failed must not drop the PIN
        store.clear_calls.lock().unwrap().clear();
        let err = coordinator
            .reset(&store, &state, BTreeSet::from([VaultCategory::Links]))
            .await
            .unwrap_err();
        match err {
            VaultError::ResetFailure { partial } => {
                assert_eq!(partial, BTreeSet::from([VaultCategory::Notes]));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            *store.clear_calls.lock().unwrap(),
            vec![VaultCategory::Notes, VaultCategory::Links]
        );
        assert!(!store.inner.is_empty(VaultCategory::Notes).await);
        assert!(state.read().await.verify("1234"));

        // Empty retry still covers the outstanding category
        store.heal();
        store.clear_calls.lock().unwrap().clear();
        coordinator.reset(&store, &state, BTreeSet::new()).await.unwrap();

        assert_eq!(*store.clear_calls.lock().unwrap(), vec![VaultCategory::Notes]);
        assert!(store.inner.is_empty(VaultCategory::Notes).await);
        assert!(!state.read().await.is_configured());
    }

    #[tokio::test]
    async fn test_commit_forgets_outstanding_categories() {
        let store = TestStore::default();
        store.fail_on(VaultCategory::Bugs);
        let state = configured_state();
        let coordinator = ResetCoordinator::new();

        assert!(coordinator.reset_all(&store, &state).await.is_err());
        store.heal();
        coordinator
            .reset(&store, &state, BTreeSet::from([VaultCategory::Bugs]))
            .await
            .unwrap();

        // A later retry has nothing on record and wipes everything again
        store.fill().await;
        store.clear_calls.lock().unwrap().clear();
        state.write().await.configure("5678", TEST_KDF).unwrap();
        coordinator
            .reset(&store, &state, BTreeSet::from([VaultCategory::Bugs]))
            .await
            .unwrap();
        assert_eq!(*store.clear_calls.lock().unwrap(), VaultCategory::ALL.to_vec());
        assert!(store.inner.is_empty(VaultCategory::Credentials).await);
    }
}
