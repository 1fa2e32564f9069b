use crate::freeze::{FreezableEntity, FreezeConfig};
use crate::persist::PersistMetadata;
use serde::{Serialize, de::DeserializeOwned};

/// What a declared field holds, as far as the freeze policy is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Ordinary data column.
    Plain,
    /// State-machine field; candidate for the governing state field.
    StateMachine,
    /// Foreign key to another registered model.
    Relation,
}

/// Describes one persisted field of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub const fn plain(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Plain,
        }
    }

    pub const fn state(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::StateMachine,
        }
    }

    pub const fn relation(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Relation,
        }
    }
}

/// Returns the descriptor called `name`, if declared.
pub fn find_field<'a>(fields: &'a [FieldDescriptor], name: &str) -> Option<&'a FieldDescriptor> {
    fields.iter().find(|field| field.name == name)
}

/// Points at a related record by type and id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationRef {
    pub type_name: &'static str,
    /// `None` when the foreign key is unset.
    pub persist_id: Option<String>,
}

impl RelationRef {
    pub fn new(type_name: &'static str, persist_id: Option<&str>) -> Self {
        Self {
            type_name,
            persist_id: persist_id.map(str::to_string),
        }
    }
}

/// A plain Rust struct stored by the persistence layer.
///
/// The model serializes to a JSON object whose keys are the declared field
/// names; that object is what dirty tracking diffs against the last
/// persisted snapshot.
pub trait Model: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Stable name of the type; also the storage key.
    const TYPE_NAME: &'static str;

    /// Every persisted field with its kind.
    const FIELDS: &'static [FieldDescriptor];

    /// Freeze configuration; `None` for models that never freeze.
    fn freeze_config() -> Option<FreezeConfig> {
        None
    }

    /// Resolves a relation attribute to the record it points at.
    fn relation(&self, _attr: &str) -> Option<RelationRef> {
        None
    }
}

/// Object-safe view of any persisted entity.
pub trait PersistEntity: Send + Sync {
    /// Returns the unique type name of the entity.
    fn type_name(&self) -> &'static str;
    /// Returns the unique persistence ID of the entity.
    fn persist_id(&self) -> &str;
    /// Returns a reference to the persistence metadata.
    fn metadata(&self) -> &PersistMetadata;
    /// Returns the freeze view of the entity when its type can freeze.
    fn as_freezable(&self) -> Option<&dyn FreezableEntity>;

    /// Short human-readable identity used in error messages.
    fn describe(&self) -> String {
        format!("<{}: {}>", self.type_name(), self.persist_id())
    }
}
