use crate::core::Result;
use crate::freeze::BypassFlag;
use crate::persist::{PersistEntity, PersistState, RelationRef};
use std::collections::BTreeSet;

/// What the freeze policy reads from an entity at check time.
pub trait FreezableEntity: PersistEntity {
    /// Current in-memory value of `field`, serialized.
    fn field_value(&self, field: &str) -> Result<Option<serde_json::Value>>;

    /// Fields whose current value differs from the last persisted snapshot.
    /// Relation fields are only reported when `include_related` is set.
    fn dirty_fields(&self, include_related: bool) -> Result<BTreeSet<String>>;

    /// Follows one relation attribute.
    fn relation(&self, attr: &str) -> Option<RelationRef>;

    fn bypass_flag(&self) -> &BypassFlag;
}

/// Read access to persisted records, used to load delegation targets.
pub trait EntityLoader {
    fn load_state(&self, type_name: &str, persist_id: &str) -> Option<PersistState>;
}
