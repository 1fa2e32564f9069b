use crate::core::{FreezeError, Result};
use crate::freeze::{FreezableEntity, FreezeConfig, StateFieldRef, validate_config};
use crate::persist::{FieldDescriptor, Model, PersistState, Persisted};
use log::debug;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type EntityFactory = fn(&PersistState) -> Result<Box<dyn FreezableEntity>>;

fn restore_entity<T: Model>(state: &PersistState) -> Result<Box<dyn FreezableEntity>> {
    Ok(Box::new(Persisted::<T>::from_state(state)?))
}

/// Registration record of one model type: its validated configuration and
/// cached state field.
pub struct TypePolicy {
    pub type_name: &'static str,
    pub fields: &'static [FieldDescriptor],
    pub config: Option<FreezeConfig>,
    pub state_field: Option<StateFieldRef>,
    factory: EntityFactory,
}

impl TypePolicy {
    pub fn is_freezable(&self) -> bool {
        self.config.is_some()
    }

    pub(crate) fn restore(&self, state: &PersistState) -> Result<Box<dyn FreezableEntity>> {
        (self.factory)(state)
    }
}

impl fmt::Debug for TypePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypePolicy")
            .field("type_name", &self.type_name)
            .field("config", &self.config)
            .field("state_field", &self.state_field)
            .finish()
    }
}

/// Bootstrap-time registry of model types.
///
/// Every type the session persists is registered once, which is where its
/// freeze configuration is checked. A misconfigured type never reaches the
/// write path.
///
/// # Examples
///
/// ```
/// use fsm_freeze::{FieldDescriptor, FreezeConfig, FreezeRegistry, Model};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Ticket {
///     state: String,
///     title: String,
/// }
///
/// impl Model for Ticket {
///     const TYPE_NAME: &'static str = "ticket";
///     const FIELDS: &'static [FieldDescriptor] = &[
///         FieldDescriptor::state("state"),
///         FieldDescriptor::plain("title"),
///     ];
///
///     fn freeze_config() -> Option<FreezeConfig> {
///         Some(FreezeConfig::new().frozen_in_states(["closed"]))
///     }
/// }
///
/// let mut registry = FreezeRegistry::new();
/// registry.register::<Ticket>().unwrap();
/// assert_eq!(registry.state_field("ticket").unwrap().unwrap().name, "state");
/// ```
#[derive(Debug, Default)]
pub struct FreezeRegistry {
    types: HashMap<&'static str, Arc<TypePolicy>>,
}

impl FreezeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the freeze configuration of `T` without registering it.
    pub fn config_check<T: Model>() -> Result<Option<StateFieldRef>> {
        match T::freeze_config() {
            Some(config) => validate_config(T::TYPE_NAME, T::FIELDS, &config),
            None => Ok(None),
        }
    }

    /// Registers `T`, failing with every configuration violation found.
    /// Registering the same type again is a no-op.
    pub fn register<T: Model>(&mut self) -> Result<&mut Self> {
        if self.types.contains_key(T::TYPE_NAME) {
            return Ok(self);
        }

        let state_field = Self::config_check::<T>()?;
        let policy = TypePolicy {
            type_name: T::TYPE_NAME,
            fields: T::FIELDS,
            config: T::freeze_config(),
            state_field,
            factory: restore_entity::<T>,
        };
        debug!(
            "registered model '{}' (freezable: {}, state field: {:?})",
            T::TYPE_NAME,
            policy.is_freezable(),
            state_field.map(|field| field.name)
        );
        self.types.insert(T::TYPE_NAME, Arc::new(policy));
        Ok(self)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    pub fn policy(&self, type_name: &str) -> Result<&Arc<TypePolicy>> {
        self.types.get(type_name).ok_or_else(|| {
            FreezeError::configuration(format!("Model type '{}' is not registered.", type_name))
        })
    }

    /// Cached governing state field of a registered type.
    pub fn state_field(&self, type_name: &str) -> Result<Option<StateFieldRef>> {
        Ok(self.policy(type_name)?.state_field)
    }

    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.types.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
