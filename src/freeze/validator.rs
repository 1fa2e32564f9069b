use crate::core::{FieldErrors, FreezeError, Result};
use crate::freeze::config::{FROZEN_DELEGATE_TO, FROZEN_IN_STATES, FROZEN_STATE_LOOKUP_FIELD};
use crate::freeze::{FreezeConfig, StateFieldRef, resolve_state_field};
use crate::persist::{FieldDescriptor, FieldKind, find_field};

/// Checks one type's freeze configuration and returns its resolved state
/// field (`None` for delegating types).
///
/// Every violation is collected before failing, so the single
/// `Configuration` error lists all of them.
pub fn validate_config(
    type_name: &'static str,
    fields: &[FieldDescriptor],
    config: &FreezeConfig,
) -> Result<Option<StateFieldRef>> {
    let mut errors = FieldErrors::new();
    let mut state_field = None;

    match config.delegate_path() {
        Some(hops) => {
            if !config.frozen_in_states.is_empty() {
                errors.push(FROZEN_IN_STATES, delegate_conflict(FROZEN_IN_STATES));
            }
            if config.frozen_state_lookup_field.is_some() {
                errors.push(
                    FROZEN_STATE_LOOKUP_FIELD,
                    delegate_conflict(FROZEN_STATE_LOOKUP_FIELD),
                );
            }
            if let Err(message) = check_delegate_path(fields, &hops) {
                errors.push(FROZEN_DELEGATE_TO, message);
            }
        }
        None => match resolve_state_field(
            type_name,
            fields,
            config.frozen_state_lookup_field.as_deref(),
        ) {
            Ok(field) => state_field = Some(field),
            Err(err) => {
                for message in err.detail().map(|detail| detail.messages()).unwrap_or_default() {
                    errors.push(FROZEN_STATE_LOOKUP_FIELD, message);
                }
            }
        },
    }

    for name in &config.non_frozen_fields {
        if find_field(fields, name).is_none() {
            errors.push(name.clone(), format!("'{}' field does not exist.", name));
        }
    }

    errors.into_result(FreezeError::Configuration)?;
    Ok(state_field)
}

fn delegate_conflict(attribute: &str) -> String {
    format!(
        "{} cannot be defined together with {}.",
        attribute, FROZEN_DELEGATE_TO
    )
}

// Only the first hop is declared on this type; later hops are checked when
// the path is walked.
fn check_delegate_path(fields: &[FieldDescriptor], hops: &[&str]) -> std::result::Result<(), String> {
    let first = match hops {
        [first, ..] if !hops.iter().any(|hop| hop.is_empty()) => *first,
        _ => return Err(format!("'{}' is not a valid relation path.", hops.join("."))),
    };
    match find_field(fields, first) {
        Some(field) if field.kind == FieldKind::Relation => Ok(()),
        Some(_) => Err(format!("'{}' is not a relation field.", first)),
        None => Err(format!("'{}' field does not exist.", first)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &[FieldDescriptor] = &[
        FieldDescriptor::state("state"),
        FieldDescriptor::plain("title"),
        FieldDescriptor::relation("parent"),
    ];

    #[test]
    fn valid_config_returns_state_field() {
        let config = FreezeConfig::new()
            .frozen_in_states(["done"])
            .non_frozen_fields(["title"]);
        let field = validate_config("task", FIELDS, &config).unwrap().unwrap();
        assert_eq!(field.name, "state");
    }

    #[test]
    fn every_missing_allow_list_field_is_reported() {
        let config = FreezeConfig::new().non_frozen_fields(["title", "ghost", "phantom"]);
        let err = validate_config("task", FIELDS, &config).unwrap_err();
        let detail = err.detail().unwrap();
        assert_eq!(detail.fields(), vec!["ghost", "phantom"]);
        assert_eq!(
            detail.field_messages("ghost").unwrap(),
            &["'ghost' field does not exist.".to_string()]
        );
    }

    #[test]
    fn resolver_failure_and_missing_fields_are_reported_together() {
        let fields = &[FieldDescriptor::plain("title")];
        let config = FreezeConfig::new().non_frozen_fields(["ghost"]);
        let err = validate_config("task", fields, &config).unwrap_err();
        assert_eq!(
            err.detail().unwrap().fields(),
            vec!["frozen_state_lookup_field", "ghost"]
        );
    }

    #[test]
    fn delegation_conflicts_are_keyed_by_attribute() {
        let config = FreezeConfig::new()
            .delegate_to("parent")
            .frozen_in_states(["done"])
            .state_lookup_field("state");
        let err = validate_config("task", FIELDS, &config).unwrap_err();
        let detail = err.detail().unwrap();
        assert_eq!(
            detail.fields(),
            vec!["frozen_in_states", "frozen_state_lookup_field"]
        );
    }

    #[test]
    fn delegating_type_skips_state_resolution() {
        let fields = &[FieldDescriptor::relation("parent")];
        let config = FreezeConfig::new().delegate_to("parent.owner");
        assert_eq!(validate_config("line", fields, &config).unwrap(), None);
    }

    #[test]
    fn delegate_path_must_start_at_a_relation() {
        let config = FreezeConfig::new().delegate_to("title");
        let err = validate_config("task", FIELDS, &config).unwrap_err();
        assert_eq!(
            err.detail().unwrap().field_messages(FROZEN_DELEGATE_TO).unwrap(),
            &["'title' is not a relation field.".to_string()]
        );

        let config = FreezeConfig::new().delegate_to("parent..owner");
        let err = validate_config("task", FIELDS, &config).unwrap_err();
        assert_eq!(
            err.detail().unwrap().field_messages(FROZEN_DELEGATE_TO).unwrap(),
            &["'parent..owner' is not a valid relation path.".to_string()]
        );
    }
}
