use crate::core::{FieldErrors, FreezeError, Result};
use crate::freeze::config::FROZEN_STATE_LOOKUP_FIELD;
use crate::persist::{FieldDescriptor, FieldKind};

pub const STATE_FIELD_NOT_FOUND: &str = "State machine field not found.";

/// The state-machine field that governs freezing for one type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateFieldRef {
    pub type_name: &'static str,
    pub name: &'static str,
}

/// Picks the governing state field among the declared fields.
///
/// A configured `lookup_field` always wins; otherwise a single state-machine
/// field is autodetected and several are ambiguous.
pub fn resolve_state_field(
    type_name: &'static str,
    fields: &[FieldDescriptor],
    lookup_field: Option<&str>,
) -> Result<StateFieldRef> {
    let candidates: Vec<&FieldDescriptor> = fields
        .iter()
        .filter(|field| field.kind == FieldKind::StateMachine)
        .collect();

    let found = match (lookup_field, candidates.as_slice()) {
        (Some(lookup), _) => candidates.iter().find(|field| field.name == lookup).copied(),
        (None, [only]) => Some(*only),
        (None, []) => None,
        (None, _) => {
            return Err(lookup_error(format!(
                "Ambiguity to find the frozen state lookup field. \
                 Please define {} on the type '{}'.",
                FROZEN_STATE_LOOKUP_FIELD, type_name
            )));
        }
    };

    found
        .map(|field| StateFieldRef {
            type_name,
            name: field.name,
        })
        .ok_or_else(|| lookup_error(STATE_FIELD_NOT_FOUND.to_string()))
}

fn lookup_error(message: String) -> FreezeError {
    let mut errors = FieldErrors::new();
    errors.push(FROZEN_STATE_LOOKUP_FIELD, message);
    FreezeError::Configuration(errors.into_detail())
}
