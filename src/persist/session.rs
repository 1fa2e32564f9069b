use super::{MemoryStore, Model, PersistEntity, Persisted, find_field};
use crate::core::{FreezeError, Result};
use crate::freeze::{BypassContext, BypassGuard, FreezableEntity, FreezePolicy};
use chrono::Utc;
use log::{debug, warn};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Session-level write options.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Report changed relation fields to the freeze check.
    pub check_related_fields: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            check_related_fields: true,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether relation fields take part in the freeze check
    pub fn check_related_fields(mut self, enabled: bool) -> Self {
        self.check_related_fields = enabled;
        self
    }
}

/// Write path over a shared store, with the freeze policy in front of every
/// update and delete.
///
/// Every clone shares the store but starts its own bypass context, so a
/// global bypass entered on one copy never reaches a copy handed to another
/// task or request.
pub struct PersistSession {
    store: Arc<Mutex<MemoryStore>>,
    policy: FreezePolicy,
    bypass: BypassContext,
    config: SessionConfig,
}

impl Clone for PersistSession {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            policy: self.policy.clone(),
            bypass: BypassContext::new(),
            config: self.config.clone(),
        }
    }
}

impl PersistSession {
    pub fn new(policy: FreezePolicy) -> Self {
        Self::with_config(policy, SessionConfig::default())
    }

    pub fn with_config(policy: FreezePolicy, config: SessionConfig) -> Self {
        Self {
            store: Arc::new(Mutex::new(MemoryStore::new())),
            policy,
            bypass: BypassContext::new(),
            config,
        }
    }

    /// Session for another request over the same store.
    pub fn fork(&self) -> Self {
        self.clone()
    }

    pub fn policy(&self) -> &FreezePolicy {
        &self.policy
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn bypass_context(&self) -> &BypassContext {
        &self.bypass
    }

    /// Suspends the freeze policy for `targets` (and for the whole session
    /// when `bypass_globally` is set or `targets` is empty) until the guard
    /// is dropped.
    pub fn bypass(
        &self,
        targets: &[&dyn PersistEntity],
        bypass_globally: bool,
    ) -> Result<BypassGuard> {
        self.bypass.enter(targets, bypass_globally)
    }

    pub fn bypass_globally(&self) -> BypassGuard {
        self.bypass.enter_global()
    }

    fn ensure_registered<T: Model>(&self) -> Result<()> {
        self.policy.registry().policy(T::TYPE_NAME).map(|_| ())
    }

    /// Inserts a new record. Creation is never subject to the freeze check.
    pub async fn create<T: Model>(&self, entity: &mut Persisted<T>) -> Result<()> {
        self.ensure_registered::<T>()?;

        let now = Utc::now();
        let mut state = entity.to_state()?;
        state.metadata.version = 1;
        state.metadata.created_at = now;
        state.metadata.updated_at = now;
        state.metadata.persisted = true;

        let fields = state.fields_object()?.clone();
        let metadata = state.metadata.clone();
        self.store.lock().await.insert(state)?;

        *entity.metadata_mut() = metadata;
        entity.mark_persisted(fields);
        debug!("created {}", entity.describe());
        Ok(())
    }

    /// Inserts an unsaved entity, otherwise runs the freeze check and writes
    /// the dirty fields.
    pub async fn save<T: Model>(&self, entity: &mut Persisted<T>) -> Result<()> {
        if !entity.is_persisted() {
            return self.create(entity).await;
        }
        self.ensure_registered::<T>()?;

        let mut store = self.store.lock().await;
        self.policy
            .freeze_check(
                &*entity,
                &self.bypass,
                &*store,
                self.config.check_related_fields,
            )
            .inspect_err(|err| warn!("save of {} rejected: {}", entity.describe(), err))?;

        let dirty = entity.dirty_fields(true)?;
        if dirty.is_empty() {
            return Ok(());
        }
        let changes: Map<String, Value> = entity
            .fields_json()?
            .into_iter()
            .filter(|(name, _)| dirty.contains(name))
            .collect();
        Self::write(&mut store, entity, changes)
    }

    /// Writes only `fields`. The caller names what changes, so the freeze
    /// check is skipped; other dirty fields stay dirty.
    pub async fn save_fields<T: Model>(
        &self,
        entity: &mut Persisted<T>,
        fields: &[&str],
    ) -> Result<()> {
        self.ensure_registered::<T>()?;
        if fields.is_empty() {
            return Ok(());
        }
        if !entity.is_persisted() {
            return Err(FreezeError::ExecutionError(format!(
                "Cannot update fields of unsaved {}",
                entity.describe()
            )));
        }

        let unknown: Vec<&str> = fields
            .iter()
            .copied()
            .filter(|field| find_field(T::FIELDS, field).is_none())
            .collect();
        if !unknown.is_empty() {
            return Err(FreezeError::ExecutionError(format!(
                "Unknown field(s) for '{}': {}",
                T::TYPE_NAME,
                unknown.join(", ")
            )));
        }

        let mut current = entity.fields_json()?;
        let changes: Map<String, Value> = fields
            .iter()
            .filter_map(|field| current.remove(*field).map(|value| (field.to_string(), value)))
            .collect();
        debug!(
            "partial update of {} ({}) skips the freeze check",
            entity.describe(),
            fields.join(", ")
        );

        let mut store = self.store.lock().await;
        Self::write(&mut store, entity, changes)
    }

    fn write<T: Model>(
        store: &mut MemoryStore,
        entity: &mut Persisted<T>,
        changes: Map<String, Value>,
    ) -> Result<()> {
        let expected_version = entity.metadata().version;
        let mut metadata = entity.metadata().clone();
        metadata.version = expected_version + 1;
        metadata.updated_at = Utc::now();

        store.update(
            T::TYPE_NAME,
            entity.persist_id(),
            expected_version,
            changes.clone(),
            metadata.clone(),
        )?;

        *entity.metadata_mut() = metadata;
        entity.mark_persisted(changes);
        Ok(())
    }

    /// Deletes the record unless it is frozen. Unsaved entities are a no-op.
    pub async fn delete<T: Model>(&self, entity: &mut Persisted<T>) -> Result<()> {
        self.ensure_registered::<T>()?;
        if !entity.is_persisted() {
            return Ok(());
        }

        let mut store = self.store.lock().await;
        self.policy
            .delete_check(&*entity, &self.bypass, &*store)
            .inspect_err(|err| warn!("delete of {} rejected: {}", entity.describe(), err))?;

        store.remove(T::TYPE_NAME, entity.persist_id())?;
        entity.mark_deleted();
        debug!("deleted {}", entity.describe());
        Ok(())
    }

    /// Reloads fields and metadata from the store, discarding local changes.
    pub async fn refresh<T: Model>(&self, entity: &mut Persisted<T>) -> Result<()> {
        self.ensure_registered::<T>()?;
        let store = self.store.lock().await;
        let state = store
            .get(T::TYPE_NAME, entity.persist_id())
            .ok_or_else(|| {
                FreezeError::NotFound(T::TYPE_NAME.to_string(), entity.persist_id().to_string())
            })?;
        entity.reload(state)
    }

    pub async fn load<T: Model>(&self, persist_id: &str) -> Result<Persisted<T>> {
        self.ensure_registered::<T>()?;
        let store = self.store.lock().await;
        let state = store.get(T::TYPE_NAME, persist_id).ok_or_else(|| {
            FreezeError::NotFound(T::TYPE_NAME.to_string(), persist_id.to_string())
        })?;
        Persisted::from_state(state)
    }

    pub async fn count<T: Model>(&self) -> usize {
        self.store.lock().await.count(T::TYPE_NAME)
    }

    pub async fn is_frozen<T: Model>(&self, entity: &Persisted<T>) -> Result<bool> {
        self.ensure_registered::<T>()?;
        let store = self.store.lock().await;
        self.policy.is_frozen(entity, &*store)
    }

    /// Runs the update check without writing anything.
    pub async fn freeze_check<T: Model>(&self, entity: &Persisted<T>) -> Result<()> {
        self.ensure_registered::<T>()?;
        let store = self.store.lock().await;
        self.policy.freeze_check(
            entity,
            &self.bypass,
            &*store,
            self.config.check_related_fields,
        )
    }
}
