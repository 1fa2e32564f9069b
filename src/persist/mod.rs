use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{FreezeError, Result};

mod entity;
mod model;
mod session;
mod store;

pub use entity::Persisted;
pub use model::{FieldDescriptor, FieldKind, Model, PersistEntity, RelationRef, find_field};
pub use session::{PersistSession, SessionConfig};
pub use store::MemoryStore;

pub fn new_persist_id() -> String {
    Uuid::new_v4().to_string()
}

/// Metadata associated with a persisted item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistMetadata {
    /// The optimistic locking version.
    pub version: i64,
    /// Timestamp of creation.
    pub created_at: DateTime<Utc>,
    /// Timestamp of last update.
    pub updated_at: DateTime<Utc>,
    /// Whether the item is currently persisted in the store.
    pub persisted: bool,
}

impl PersistMetadata {
    /// Creates new metadata initialized with the current time.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            version: 0,
            created_at: now,
            updated_at: now,
            persisted: false,
        }
    }
}

/// Represents the raw state of a persisted item as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistState {
    pub persist_id: String,
    pub type_name: String,
    pub metadata: PersistMetadata,
    pub fields: serde_json::Value,
}

impl PersistState {
    /// Returns the fields as a JSON object, or an error if they are not an object.
    pub fn fields_object(&self) -> Result<&serde_json::Map<String, serde_json::Value>> {
        self.fields.as_object().ok_or_else(|| {
            FreezeError::Serialization("Persist state fields must be a JSON object".to_string())
        })
    }

    /// Returns a mutable reference to the fields as a JSON object.
    pub fn fields_object_mut(
        &mut self,
    ) -> Result<&mut serde_json::Map<String, serde_json::Value>> {
        self.fields.as_object_mut().ok_or_else(|| {
            FreezeError::Serialization("Persist state fields must be a JSON object".to_string())
        })
    }
}
