use super::{FieldKind, Model, PersistEntity, PersistMetadata, PersistState, RelationRef};
use super::{find_field, new_persist_id};
use crate::core::{FreezeError, Result};
use crate::freeze::{BypassFlag, FreezableEntity};
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::ops::{Deref, DerefMut};

/// A model instance bound to the persistence layer.
///
/// Holds the last persisted snapshot of the model's fields; the dirty field
/// set is the difference between that snapshot and the current value. The
/// wrapper derefs to the model, so fields are read and assigned directly.
#[derive(Debug, Clone)]
pub struct Persisted<T: Model> {
    model: T,
    persist_id: String,
    metadata: PersistMetadata,
    snapshot: Map<String, Value>,
    bypass: BypassFlag,
}

impl<T: Model> Persisted<T> {
    pub fn new(model: T) -> Self {
        Self::with_id(new_persist_id(), model)
    }

    pub fn with_id(persist_id: impl Into<String>, model: T) -> Self {
        Self {
            model,
            persist_id: persist_id.into(),
            metadata: PersistMetadata::new(Utc::now()),
            snapshot: Map::new(),
            bypass: BypassFlag::new(),
        }
    }

    pub fn model(&self) -> &T {
        &self.model
    }

    pub fn is_persisted(&self) -> bool {
        self.metadata.persisted
    }

    /// Serializes the model into its field object.
    pub fn fields_json(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(&self.model)? {
            Value::Object(fields) => Ok(fields),
            other => Err(FreezeError::Serialization(format!(
                "Model '{}' must serialize to a JSON object, got {}",
                T::TYPE_NAME,
                other
            ))),
        }
    }

    /// Returns `true` when any field, relations included, differs from the
    /// last persisted snapshot.
    pub fn is_dirty(&self) -> Result<bool> {
        Ok(!self.diff(true)?.is_empty())
    }

    fn diff(&self, include_related: bool) -> Result<BTreeSet<String>> {
        let current = self.fields_json()?;
        let mut dirty: BTreeSet<String> = current
            .iter()
            .filter(|(name, value)| self.snapshot.get(name.as_str()) != Some(*value))
            .map(|(name, _)| name.clone())
            .collect();
        dirty.extend(
            self.snapshot
                .keys()
                .filter(|name| !current.contains_key(name.as_str()))
                .cloned(),
        );

        if !include_related {
            dirty.retain(|name| {
                !matches!(
                    find_field(T::FIELDS, name),
                    Some(field) if field.kind == FieldKind::Relation
                )
            });
        }
        Ok(dirty)
    }

    pub(crate) fn from_state(state: &PersistState) -> Result<Self> {
        if state.type_name != T::TYPE_NAME {
            return Err(FreezeError::ExecutionError(format!(
                "Cannot restore '{}' record as '{}'",
                state.type_name,
                T::TYPE_NAME
            )));
        }
        let model: T = serde_json::from_value(state.fields.clone())?;
        Ok(Self {
            model,
            persist_id: state.persist_id.clone(),
            metadata: state.metadata.clone(),
            snapshot: state.fields_object()?.clone(),
            bypass: BypassFlag::new(),
        })
    }

    pub(crate) fn to_state(&self) -> Result<PersistState> {
        Ok(PersistState {
            persist_id: self.persist_id.clone(),
            type_name: T::TYPE_NAME.to_string(),
            metadata: self.metadata.clone(),
            fields: Value::Object(self.fields_json()?),
        })
    }

    pub(crate) fn metadata_mut(&mut self) -> &mut PersistMetadata {
        &mut self.metadata
    }

    /// Records `fields` as persisted; other snapshot entries are kept.
    pub(crate) fn mark_persisted(&mut self, fields: Map<String, Value>) {
        self.snapshot.extend(fields);
        self.metadata.persisted = true;
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.snapshot.clear();
        self.metadata.persisted = false;
    }

    /// Replaces model, snapshot and metadata with the stored record. The
    /// bypass flag is left untouched.
    pub(crate) fn reload(&mut self, state: &PersistState) -> Result<()> {
        let Self {
            model,
            metadata,
            snapshot,
            ..
        } = Self::from_state(state)?;
        self.model = model;
        self.metadata = metadata;
        self.snapshot = snapshot;
        Ok(())
    }
}

impl<T: Model> Deref for Persisted<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.model
    }
}

impl<T: Model> DerefMut for Persisted<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.model
    }
}

impl<T: Model> PersistEntity for Persisted<T> {
    fn type_name(&self) -> &'static str {
        T::TYPE_NAME
    }

    fn persist_id(&self) -> &str {
        &self.persist_id
    }

    fn metadata(&self) -> &PersistMetadata {
        &self.metadata
    }

    fn as_freezable(&self) -> Option<&dyn FreezableEntity> {
        T::freeze_config().map(|_| self as &dyn FreezableEntity)
    }
}

impl<T: Model> FreezableEntity for Persisted<T> {
    fn field_value(&self, field: &str) -> Result<Option<Value>> {
        Ok(self.fields_json()?.remove(field))
    }

    fn dirty_fields(&self, include_related: bool) -> Result<BTreeSet<String>> {
        self.diff(include_related)
    }

    fn relation(&self, attr: &str) -> Option<RelationRef> {
        self.model.relation(attr)
    }

    fn bypass_flag(&self) -> &BypassFlag {
        &self.bypass
    }
}
