use crate::core::{FieldErrors, FreezeError, Result};
use crate::freeze::config::FROZEN_DELEGATE_TO;
use crate::freeze::{
    BypassContext, EntityLoader, FreezableEntity, FreezeRegistry, StateFieldRef, TypePolicy,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{Level, event};

pub const FROZEN_FIELD_MESSAGE: &str = "Cannot change frozen field.";

/// Upper bound on delegation hops followed before giving up on a chain.
pub const MAX_DELEGATION_DEPTH: usize = 16;

/// The entity whose state decides whether a checked entity is frozen.
#[derive(Debug, Clone)]
pub struct Governing {
    pub policy: Arc<TypePolicy>,
    pub state_field: StateFieldRef,
    pub state: Option<Value>,
}

impl Governing {
    pub fn is_frozen(&self) -> bool {
        match (&self.policy.config, &self.state) {
            (Some(config), Some(state)) => config.is_frozen_state(&state_label(state)),
            _ => false,
        }
    }

    /// Whether `field` may change while frozen.
    pub fn allows(&self, field: &str) -> bool {
        field == self.state_field.name
            || self
                .policy
                .config
                .as_ref()
                .is_some_and(|config| config.is_non_frozen_field(field))
    }
}

fn state_label(state: &Value) -> String {
    match state {
        Value::String(label) => label.clone(),
        other => other.to_string(),
    }
}

fn delegate_error(message: String) -> FreezeError {
    let mut errors = FieldErrors::new();
    errors.push(FROZEN_DELEGATE_TO, message);
    FreezeError::Configuration(errors.into_detail())
}

/// Write-path gate injected into the persistence session.
///
/// Holds the registry built at bootstrap; the session calls
/// [`FreezePolicy::freeze_check`] before every update and
/// [`FreezePolicy::delete_check`] before every delete.
#[derive(Debug, Clone)]
pub struct FreezePolicy {
    registry: Arc<FreezeRegistry>,
}

impl FreezePolicy {
    pub fn new(registry: FreezeRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &FreezeRegistry {
        &self.registry
    }

    /// Follows delegation from `entity` to the entity holding the state
    /// field that governs it.
    pub fn governing(
        &self,
        entity: &dyn FreezableEntity,
        loader: &dyn EntityLoader,
    ) -> Result<Governing> {
        let mut loaded: Option<Box<dyn FreezableEntity>> = None;

        for _ in 0..=MAX_DELEGATION_DEPTH {
            let current: &dyn FreezableEntity = match &loaded {
                Some(boxed) => boxed.as_ref(),
                None => entity,
            };
            let policy = self.registry.policy(current.type_name())?.clone();
            let config = policy.config.as_ref().ok_or_else(|| {
                FreezeError::configuration(format!(
                    "Model type '{}' is not freezable.",
                    policy.type_name
                ))
            })?;

            if let Some(hops) = config.delegate_path() {
                let next = self.follow(current, &hops, loader)?;
                loaded = Some(next);
                continue;
            }

            let state_field = policy.state_field.ok_or_else(|| {
                FreezeError::configuration(format!(
                    "Model type '{}' has no resolved state field.",
                    policy.type_name
                ))
            })?;
            let state = current.field_value(state_field.name)?;
            return Ok(Governing {
                policy,
                state_field,
                state,
            });
        }

        Err(delegate_error(format!(
            "Delegation from '{}' does not reach a state field within {} hops.",
            entity.type_name(),
            MAX_DELEGATION_DEPTH
        )))
    }

    fn follow(
        &self,
        from: &dyn FreezableEntity,
        hops: &[&str],
        loader: &dyn EntityLoader,
    ) -> Result<Box<dyn FreezableEntity>> {
        let mut reached: Option<(Arc<TypePolicy>, Box<dyn FreezableEntity>)> = None;

        for &hop in hops {
            let holder: &dyn FreezableEntity = match &reached {
                Some((_, boxed)) => boxed.as_ref(),
                None => from,
            };
            let relation = holder.relation(hop).ok_or_else(|| {
                delegate_error(format!(
                    "'{}' is not a relation of '{}'.",
                    hop,
                    holder.type_name()
                ))
            })?;
            let persist_id = relation.persist_id.ok_or_else(|| {
                delegate_error(format!(
                    "'{}' of {} is not set and does not refer to a freezable entity.",
                    hop,
                    holder.describe()
                ))
            })?;
            let target = self.registry.policy(relation.type_name)?.clone();
            let state = loader
                .load_state(relation.type_name, &persist_id)
                .ok_or_else(|| FreezeError::NotFound(relation.type_name.to_string(), persist_id))?;
            let restored = target.restore(&state)?;
            reached = Some((target, restored));
        }

        match reached {
            Some((target, entity)) if target.is_freezable() => Ok(entity),
            _ => Err(delegate_error(format!(
                "'{}' does not refer to a freezable entity.",
                hops.join(".")
            ))),
        }
    }

    /// Whether `entity` is currently frozen, through delegation if configured.
    /// Bypass does not change the answer.
    pub fn is_frozen(&self, entity: &dyn FreezableEntity, loader: &dyn EntityLoader) -> Result<bool> {
        if !self.registry.policy(entity.type_name())?.is_freezable() {
            return Ok(false);
        }
        Ok(self.governing(entity, loader)?.is_frozen())
    }

    /// Rejects an update of a frozen entity that touches any field outside
    /// the allow-list, naming every offending field.
    pub fn freeze_check(
        &self,
        entity: &dyn FreezableEntity,
        bypass: &BypassContext,
        loader: &dyn EntityLoader,
        include_related: bool,
    ) -> Result<()> {
        if bypass.is_bypassed(entity) {
            event!(
                Level::DEBUG,
                type_name = entity.type_name(),
                persist_id = entity.persist_id(),
                "freeze check bypassed"
            );
            return Ok(());
        }
        if !self.registry.policy(entity.type_name())?.is_freezable() {
            return Ok(());
        }

        let governing = self.governing(entity, loader)?;
        if !governing.is_frozen() {
            return Ok(());
        }

        let mut errors = FieldErrors::new();
        for field in entity.dirty_fields(include_related)? {
            if !governing.allows(&field) {
                errors.push(field, FROZEN_FIELD_MESSAGE);
            }
        }

        if !errors.is_empty() {
            event!(
                Level::WARN,
                type_name = entity.type_name(),
                persist_id = entity.persist_id(),
                governed_by = governing.policy.type_name,
                "rejected change of frozen fields"
            );
        }
        errors.into_result(FreezeError::Validation)
    }

    /// Rejects deleting a frozen entity.
    pub fn delete_check(
        &self,
        entity: &dyn FreezableEntity,
        bypass: &BypassContext,
        loader: &dyn EntityLoader,
    ) -> Result<()> {
        if bypass.is_bypassed(entity) {
            return Ok(());
        }
        if self.is_frozen(entity, loader)? {
            event!(
                Level::WARN,
                type_name = entity.type_name(),
                persist_id = entity.persist_id(),
                "rejected delete of frozen entity"
            );
            return Err(FreezeError::validation(format!(
                "{} is frozen, cannot be deleted.",
                entity.describe()
            )));
        }
        Ok(())
    }
}
