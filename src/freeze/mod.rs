//! Freeze policy engine.
//!
//! Once an entity's governing state is listed in `frozen_in_states`, updates
//! may only touch allow-listed fields (plus the state field) and deletes are
//! refused, unless a bypass scope covers the entity or the whole request.

mod bypass;
mod check;
pub mod config;
mod entity;
mod registry;
mod resolver;
mod validator;

pub use bypass::{BypassContext, BypassFlag, BypassGuard};
pub use check::{FROZEN_FIELD_MESSAGE, FreezePolicy, Governing, MAX_DELEGATION_DEPTH};
pub use config::FreezeConfig;
pub use entity::{EntityLoader, FreezableEntity};
pub use registry::{FreezeRegistry, TypePolicy};
pub use resolver::{STATE_FIELD_NOT_FOUND, StateFieldRef, resolve_state_field};
pub use validator::validate_config;
