use super::{PersistMetadata, PersistState};
use crate::core::{FreezeError, Result};
use crate::freeze::EntityLoader;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// Record storage keyed by type name, then persist id.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: HashMap<String, BTreeMap<String, PersistState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, state: PersistState) -> Result<()> {
        let table = self.tables.entry(state.type_name.clone()).or_default();
        if table.contains_key(&state.persist_id) {
            return Err(FreezeError::AlreadyExists(
                state.type_name.clone(),
                state.persist_id.clone(),
            ));
        }
        table.insert(state.persist_id.clone(), state);
        Ok(())
    }

    pub fn get(&self, type_name: &str, persist_id: &str) -> Option<&PersistState> {
        self.tables.get(type_name)?.get(persist_id)
    }

    /// Writes `changes` over the stored fields when the stored version still
    /// equals `expected_version`.
    pub fn update(
        &mut self,
        type_name: &str,
        persist_id: &str,
        expected_version: i64,
        changes: Map<String, Value>,
        metadata: PersistMetadata,
    ) -> Result<()> {
        let state = self
            .tables
            .get_mut(type_name)
            .and_then(|table| table.get_mut(persist_id))
            .ok_or_else(|| FreezeError::NotFound(type_name.to_string(), persist_id.to_string()))?;

        if state.metadata.version != expected_version {
            return Err(FreezeError::ExecutionError(format!(
                "Optimistic lock conflict for {}:{}",
                type_name, persist_id
            )));
        }

        state.fields_object_mut()?.extend(changes);
        state.metadata = metadata;
        Ok(())
    }

    pub fn remove(&mut self, type_name: &str, persist_id: &str) -> Result<PersistState> {
        self.tables
            .get_mut(type_name)
            .and_then(|table| table.remove(persist_id))
            .ok_or_else(|| FreezeError::NotFound(type_name.to_string(), persist_id.to_string()))
    }

    pub fn count(&self, type_name: &str) -> usize {
        self.tables.get(type_name).map_or(0, BTreeMap::len)
    }
}

impl EntityLoader for MemoryStore {
    fn load_state(&self, type_name: &str, persist_id: &str) -> Option<PersistState> {
        self.get(type_name, persist_id).cloned()
    }
}
