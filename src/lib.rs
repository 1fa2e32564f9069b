// ============================================================================
// fsm_freeze Library
// ============================================================================

//! Freeze policy for persisted state-machine entities.
//!
//! A model declares its fields (one of them a state-machine field) and a
//! [`FreezeConfig`]. After registration in a [`FreezeRegistry`], every
//! [`PersistSession`] update of an instance in a frozen state may only touch
//! allow-listed fields, and deletes are refused, until a bypass scope is
//! entered.
//!
//! # Examples
//!
//! ```
//! use fsm_freeze::{
//!     FieldDescriptor, FreezeConfig, FreezePolicy, FreezeRegistry, Model, PersistSession,
//!     Persisted,
//! };
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Order {
//!     state: String,
//!     total: i64,
//!     note: String,
//! }
//!
//! impl Model for Order {
//!     const TYPE_NAME: &'static str = "order";
//!     const FIELDS: &'static [FieldDescriptor] = &[
//!         FieldDescriptor::state("state"),
//!         FieldDescriptor::plain("total"),
//!         FieldDescriptor::plain("note"),
//!     ];
//!
//!     fn freeze_config() -> Option<FreezeConfig> {
//!         Some(
//!             FreezeConfig::new()
//!                 .frozen_in_states(["completed"])
//!                 .non_frozen_fields(["note"]),
//!         )
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> fsm_freeze::Result<()> {
//! let mut registry = FreezeRegistry::new();
//! registry.register::<Order>()?;
//! let session = PersistSession::new(FreezePolicy::new(registry));
//!
//! let mut order = Persisted::new(Order {
//!     state: "new".into(),
//!     total: 10,
//!     note: String::new(),
//! });
//! session.create(&mut order).await?;
//!
//! order.state = "completed".into();
//! session.save(&mut order).await?;
//!
//! order.total = 99;
//! assert!(session.save(&mut order).await.is_err());
//!
//! {
//!     let _bypass = session.bypass(&[&order], false)?;
//!     session.save(&mut order).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod freeze;
pub mod persist;

pub use crate::core::{ErrorDetail, FieldErrors, FreezeError, Result};
pub use crate::freeze::{
    BypassContext, BypassFlag, BypassGuard, EntityLoader, FreezableEntity, FreezeConfig,
    FreezePolicy, FreezeRegistry, MAX_DELEGATION_DEPTH, StateFieldRef,
};
pub use crate::persist::{
    FieldDescriptor, FieldKind, MemoryStore, Model, PersistEntity, PersistMetadata, PersistSession,
    PersistState, Persisted, RelationRef, SessionConfig,
};
