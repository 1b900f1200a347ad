// ABOUTME: Prefills the protocol form from PDF-extracted protocol data
// ABOUTME: Maps the nested extraction schema onto flat draft fields

use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use crate::state::ProtocolForm;

enum Convert {
    Direct,
    WeeksToDays,
}

struct Mapping {
    field: &'static str,
    /// Candidate locations, first non-empty wins
    paths: &'static [&'static [&'static str]],
    convert: Convert,
}

const fn map(field: &'static str, paths: &'static [&'static [&'static str]]) -> Mapping {
    Mapping {
        field,
        paths,
        convert: Convert::Direct,
    }
}

const MAPPINGS: &[Mapping] = &[
    map("trial_name", &[&["trial_name"], &["metadata", "trial_name"]]),
    map("nct_id", &[&["nct_id"], &["metadata", "nct_id"]]),
    map("sponsor", &[&["sponsor"], &["metadata", "sponsor"]]),
    map("phase", &[&["phase"], &["metadata", "phase"]]),
    map("drug_name", &[&["drug_name"], &["drug_profile", "name"]]),
    map("drug_class", &[&["drug_class"], &["drug_profile", "drug_class"]]),
    map(
        "mechanism_of_action",
        &[&["mechanism_of_action"], &["drug_profile", "mechanism_of_action"]],
    ),
    map("description", &[&["description"]]),
    map("design_type", &[&["design_type"], &["study_design", "design_type"]]),
    map("blinding", &[&["blinding"], &["study_design", "blinding"]]),
    map("randomization", &[&["randomization"], &["study_design", "randomization"]]),
    map(
        "placebo_controlled",
        &[&["placebo_controlled"], &["study_design", "placebo_controlled"]],
    ),
    map("duration_days", &[&["duration_days"]]),
    Mapping {
        field: "duration_days",
        paths: &[&["study_design", "duration_weeks"]],
        convert: Convert::WeeksToDays,
    },
    map("primary_endpoint", &[&["primary_endpoint"], &["primary_endpoints"]]),
    map("secondary_endpoints", &[&["secondary_endpoints"]]),
    map(
        "therapeutic_area",
        &[&["therapeutic_area"], &["patient_population", "therapeutic_area"]],
    ),
    map(
        "disease_indication",
        &[&["disease_indication"], &["patient_population", "disease_indication"]],
    ),
    map("age_range", &[&["age_range"], &["patient_population", "age_range"]]),
    map("gender", &[&["gender"], &["patient_population", "gender"]]),
    map(
        "target_enrollment",
        &[&["target_enrollment"], &["statistical_plan", "planned_enrollment"]],
    ),
    map(
        "inclusion_criteria",
        &[&["inclusion_criteria"], &["patient_population", "inclusion_criteria"]],
    ),
    map(
        "exclusion_criteria",
        &[&["exclusion_criteria"], &["patient_population", "exclusion_criteria"]],
    ),
    map(
        "power_calculation",
        &[&["power_calculation"], &["statistical_plan", "power_calculation_provided"]],
    ),
    map("alpha_level", &[&["alpha_level"], &["statistical_plan", "alpha_level"]]),
    map(
        "expected_effect_size",
        &[&["expected_effect_size"], &["statistical_plan", "expected_effect_size"]],
    ),
    map(
        "dropout_rate",
        &[&["dropout_rate"], &["statistical_plan", "dropout_rate_assumption"]],
    ),
    map(
        "primary_analysis_method",
        &[&["primary_analysis_method"], &["statistical_plan", "primary_analysis_method"]],
    ),
    map("safety_monitoring_plan", &[&["safety_monitoring_plan"]]),
    map(
        "known_contraindications",
        &[&["known_contraindications"], &["drug_profile", "known_contraindications"]],
    ),
];

impl ProtocolForm {
    /// Copy extracted protocol data into the form. Fields the extraction left
    /// empty keep their current value. Returns how many fields were filled.
    pub fn prefill_from_extracted(&mut self, extracted: &Value) -> usize {
        let mut seen = HashSet::new();
        for mapping in MAPPINGS {
            // An earlier mapping for the same field wins
            if seen.contains(mapping.field) {
                continue;
            }
            let Some(text) = extract(mapping, extracted) else {
                continue;
            };
            self.set_field(mapping.field, &text);
            seen.insert(mapping.field);
        }
        let filled = seen.len();
        debug!(filled, "Prefilled protocol form from extracted data");
        filled
    }
}

fn extract(mapping: &Mapping, extracted: &Value) -> Option<String> {
    mapping.paths.iter().find_map(|path| {
        let value = lookup(extracted, path)?;
        let text = match mapping.convert {
            Convert::Direct => render(value)?,
            Convert::WeeksToDays => {
                let weeks = value.as_f64()?;
                format!("{}", (weeks * 7.0).round() as i64)
            }
        };
        (!text.trim().is_empty()).then_some(text)
    })
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

fn render(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(if *b { "yes" } else { "no" }.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    // Endpoint objects carry their label under `name`
                    Value::Object(obj) => obj.get("name").and_then(render),
                    other => render(other),
                })
                .collect();
            (!parts.is_empty()).then(|| parts.join("\n"))
        }
        Value::Object(_) => None,
    }
}
