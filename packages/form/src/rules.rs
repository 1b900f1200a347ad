// ABOUTME: Declared validation rules for protocol form fields
// ABOUTME: Fields without a rule are always valid

/// Field validator: `Err` carries the message shown under the field
pub type Validator = fn(&str) -> Result<(), String>;

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub validator: Validator,
}

/// The complete rule set. Every other field is free text or optional.
pub const FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        field: "trial_name",
        validator: validate_trial_name,
    },
    FieldRule {
        field: "phase",
        validator: validate_phase,
    },
    FieldRule {
        field: "therapeutic_area",
        validator: validate_therapeutic_area,
    },
    FieldRule {
        field: "target_enrollment",
        validator: validate_target_enrollment,
    },
    FieldRule {
        field: "duration_days",
        validator: validate_duration_days,
    },
];

pub fn rule_for(field: &str) -> Option<Validator> {
    FIELD_RULES
        .iter()
        .find(|rule| rule.field == field)
        .map(|rule| rule.validator)
}

fn validate_trial_name(value: &str) -> Result<(), String> {
    if value.trim().chars().count() < 3 {
        return Err("Trial name must be at least 3 characters".to_string());
    }
    Ok(())
}

fn validate_phase(value: &str) -> Result<(), String> {
    require(value, "Phase is required")
}

fn validate_therapeutic_area(value: &str) -> Result<(), String> {
    require(value, "Therapeutic area is required")
}

fn validate_target_enrollment(value: &str) -> Result<(), String> {
    positive_integer(value, "Target enrollment must be a positive number")
}

fn validate_duration_days(value: &str) -> Result<(), String> {
    positive_integer(value, "Duration must be a positive number of days")
}

fn require(value: &str, message: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(message.to_string())
    } else {
        Ok(())
    }
}

fn positive_integer(value: &str, message: &str) -> Result<(), String> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(()),
        _ => Err(message.to_string()),
    }
}
