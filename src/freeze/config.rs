/// Attribute names used as keys in configuration error payloads.
pub const FROZEN_IN_STATES: &str = "frozen_in_states";
pub const FROZEN_STATE_LOOKUP_FIELD: &str = "frozen_state_lookup_field";
pub const FROZEN_DELEGATE_TO: &str = "frozen_delegate_to";

/// Per-type freeze configuration.
///
/// Declared by a model through `Model::freeze_config` and validated once
/// when the type is registered.
///
/// # Examples
///
/// ```
/// use fsm_freeze::FreezeConfig;
///
/// let config = FreezeConfig::new()
///     .frozen_in_states(["active", "archived"])
///     .non_frozen_fields(["notes"]);
///
/// assert!(config.is_frozen_state("active"));
/// assert!(!config.is_frozen_state("new"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreezeConfig {
    /// State values that freeze the entity.
    pub frozen_in_states: Vec<String>,

    /// Fields that stay writable while frozen. The state field is always
    /// writable and does not need to be listed.
    pub non_frozen_fields: Vec<String>,

    /// Names the governing state field when the type declares several.
    pub frozen_state_lookup_field: Option<String>,

    /// Dotted relation path to the entity whose frozen status governs this one.
    pub frozen_delegate_to: Option<String>,
}

impl FreezeConfig {
    /// Create an empty configuration: nothing is ever frozen.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the states that freeze the entity
    pub fn frozen_in_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.frozen_in_states = states.into_iter().map(Into::into).collect();
        self
    }

    /// Set the fields exempt from freezing
    pub fn non_frozen_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.non_frozen_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Set the state field used when several are declared
    pub fn state_lookup_field(mut self, field: impl Into<String>) -> Self {
        self.frozen_state_lookup_field = Some(field.into());
        self
    }

    /// Delegate the frozen decision to a related entity
    pub fn delegate_to(mut self, path: impl Into<String>) -> Self {
        self.frozen_delegate_to = Some(path.into());
        self
    }

    pub fn is_frozen_state(&self, state: &str) -> bool {
        self.frozen_in_states.iter().any(|frozen| frozen == state)
    }

    pub fn is_non_frozen_field(&self, field: &str) -> bool {
        self.non_frozen_fields.iter().any(|allowed| allowed == field)
    }

    /// Returns the delegation path split into hops.
    pub fn delegate_path(&self) -> Option<Vec<&str>> {
        self.frozen_delegate_to
            .as_deref()
            .map(|path| path.split('.').collect())
    }
}
