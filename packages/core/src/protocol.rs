// ABOUTME: Protocol draft model backing the multi-step entry form
// ABOUTME: Field catalogue, draft values and the analysis request payload

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Logical step of the protocol form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormStep {
    Basic,
    Design,
    Population,
    Statistics,
    Safety,
}

impl FormStep {
    pub const ALL: [FormStep; 5] = [
        FormStep::Basic,
        FormStep::Design,
        FormStep::Population,
        FormStep::Statistics,
        FormStep::Safety,
    ];

    pub fn index(self) -> usize {
        match self {
            FormStep::Basic => 0,
            FormStep::Design => 1,
            FormStep::Population => 2,
            FormStep::Statistics => 3,
            FormStep::Safety => 4,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn title(self) -> &'static str {
        match self {
            FormStep::Basic => "Basic Information",
            FormStep::Design => "Study Design",
            FormStep::Population => "Patient Population",
            FormStep::Statistics => "Statistical Plan",
            FormStep::Safety => "Safety Monitoring",
        }
    }
}

/// Input kind of a protocol field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    LongText,
    /// Free text holding one entry per line
    List,
    Number,
    Choice(&'static [&'static str]),
}

/// Static description of one protocol field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub step: FormStep,
    pub kind: FieldKind,
    pub placeholder: Option<&'static str>,
}

const PHASES: &[&str] = &[
    "Phase 1",
    "Phase 1/2",
    "Phase 2",
    "Phase 2/3",
    "Phase 3",
    "Phase 4",
];
const DESIGN_TYPES: &[&str] = &["Parallel", "Crossover", "Factorial", "Single Group"];
const BLINDING: &[&str] = &["open-label", "single-blind", "double-blind", "triple-blind"];
const YES_NO: &[&str] = &["yes", "no"];

const fn field(
    name: &'static str,
    label: &'static str,
    step: FormStep,
    kind: FieldKind,
    placeholder: Option<&'static str>,
) -> FieldSpec {
    FieldSpec {
        name,
        label,
        step,
        kind,
        placeholder,
    }
}

/// Every field of the protocol form, in display order
pub const PROTOCOL_FIELDS: &[FieldSpec] = &[
    // Basic information
    field("trial_name", "Trial Name", FormStep::Basic, FieldKind::Text, Some("e.g. ASPIRE-3")),
    field("nct_id", "NCT ID", FormStep::Basic, FieldKind::Text, Some("NCT01234567")),
    field("sponsor", "Sponsor", FormStep::Basic, FieldKind::Text, None),
    field("phase", "Phase", FormStep::Basic, FieldKind::Choice(PHASES), None),
    field("drug_name", "Drug Name", FormStep::Basic, FieldKind::Text, None),
    field("drug_class", "Drug Class", FormStep::Basic, FieldKind::Text, Some("e.g. SSRI")),
    field("mechanism_of_action", "Mechanism of Action", FormStep::Basic, FieldKind::LongText, None),
    field("description", "Description", FormStep::Basic, FieldKind::LongText, None),
    // Study design
    field("design_type", "Design Type", FormStep::Design, FieldKind::Choice(DESIGN_TYPES), None),
    field("blinding", "Blinding", FormStep::Design, FieldKind::Choice(BLINDING), None),
    field("randomization", "Randomized", FormStep::Design, FieldKind::Choice(YES_NO), None),
    field("placebo_controlled", "Placebo Controlled", FormStep::Design, FieldKind::Choice(YES_NO), None),
    field("duration_days", "Duration (days)", FormStep::Design, FieldKind::Number, Some("365")),
    field("primary_endpoint", "Primary Endpoint", FormStep::Design, FieldKind::LongText, None),
    field("secondary_endpoints", "Secondary Endpoints", FormStep::Design, FieldKind::List, None),
    // Patient population
    field("therapeutic_area", "Therapeutic Area", FormStep::Population, FieldKind::Text, Some("e.g. Oncology")),
    field("disease_indication", "Disease Indication", FormStep::Population, FieldKind::Text, None),
    field("age_range", "Age Range", FormStep::Population, FieldKind::Text, Some("18-65")),
    field("gender", "Gender", FormStep::Population, FieldKind::Text, None),
    field("target_enrollment", "Target Enrollment", FormStep::Population, FieldKind::Number, Some("300")),
    field("inclusion_criteria", "Inclusion Criteria", FormStep::Population, FieldKind::List, None),
    field("exclusion_criteria", "Exclusion Criteria", FormStep::Population, FieldKind::List, None),
    // Statistical plan
    field("power_calculation", "Power Calculation", FormStep::Statistics, FieldKind::LongText, None),
    field("alpha_level", "Alpha Level", FormStep::Statistics, FieldKind::Number, Some("0.05")),
    field("expected_effect_size", "Expected Effect Size", FormStep::Statistics, FieldKind::Number, None),
    field("dropout_rate", "Dropout Rate", FormStep::Statistics, FieldKind::Number, Some("0.15")),
    field("primary_analysis_method", "Primary Analysis Method", FormStep::Statistics, FieldKind::Text, None),
    // Safety monitoring
    field("safety_monitoring_plan", "Safety Monitoring Plan", FormStep::Safety, FieldKind::LongText, None),
    field("known_contraindications", "Known Contraindications", FormStep::Safety, FieldKind::List, None),
    field("adverse_event_reporting", "Adverse Event Reporting", FormStep::Safety, FieldKind::LongText, None),
    field("stopping_rules", "Stopping Rules", FormStep::Safety, FieldKind::LongText, None),
];

/// Look up the spec for a field name
pub fn field_spec(name: &str) -> Option<&'static FieldSpec> {
    PROTOCOL_FIELDS.iter().find(|spec| spec.name == name)
}

/// A single draft value: free text or an optional number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DraftValue {
    Number(Option<f64>),
    Text(String),
}

impl DraftValue {
    /// Default value for a field kind
    pub fn empty_for(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Number => DraftValue::Number(None),
            _ => DraftValue::Text(String::new()),
        }
    }

    /// Wrap raw input text for a field kind. The text is kept exactly as
    /// typed so validation sees what the user entered; only a blank numeric
    /// field collapses to `Number(None)`.
    pub fn from_input(kind: FieldKind, input: &str) -> Self {
        match kind {
            FieldKind::Number if input.trim().is_empty() => DraftValue::Number(None),
            _ => DraftValue::Text(input.to_string()),
        }
    }

    /// JSON form of the value for a field kind. Numeric text that parses
    /// becomes a number; anything else goes out as typed.
    pub fn to_json(&self, kind: FieldKind) -> Value {
        match (kind, self) {
            (FieldKind::Number, DraftValue::Text(text)) => match text.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => serde_json::Number::from_f64(n)
                    .map(Value::Number)
                    .unwrap_or_else(|| Value::String(text.clone())),
                _ => Value::String(text.clone()),
            },
            (_, DraftValue::Number(Some(n))) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            (_, DraftValue::Number(None)) => Value::Null,
            (_, DraftValue::Text(text)) => Value::String(text.clone()),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            DraftValue::Number(n) => n.is_none(),
            DraftValue::Text(s) => s.trim().is_empty(),
        }
    }

    /// Text rendering used by validation and prompts
    pub fn as_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DraftValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftValue::Text(s) => f.write_str(s),
            DraftValue::Number(None) => Ok(()),
            DraftValue::Number(Some(n)) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            DraftValue::Number(Some(n)) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for DraftValue {
    fn from(value: &str) -> Self {
        DraftValue::Text(value.to_string())
    }
}

impl From<String> for DraftValue {
    fn from(value: String) -> Self {
        DraftValue::Text(value)
    }
}

impl From<f64> for DraftValue {
    fn from(value: f64) -> Self {
        DraftValue::Number(Some(value))
    }
}

impl From<i64> for DraftValue {
    fn from(value: i64) -> Self {
        DraftValue::Number(Some(value as f64))
    }
}

/// In-progress protocol: flat mapping of field name to value.
///
/// Every catalogued field always carries a value, so the draft serializes
/// cleanly at any point of editing. Unknown names are kept as extra fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, DraftValue>",
    into = "BTreeMap<String, DraftValue>"
)]
pub struct ProtocolDraft {
    fields: BTreeMap<String, DraftValue>,
}

impl ProtocolDraft {
    pub fn new() -> Self {
        let fields = PROTOCOL_FIELDS
            .iter()
            .map(|spec| (spec.name.to_string(), DraftValue::empty_for(spec.kind)))
            .collect();
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&DraftValue> {
        self.fields.get(name)
    }

    /// Text view of a field; missing fields read as empty
    pub fn text(&self, name: &str) -> String {
        self.fields
            .get(name)
            .map(DraftValue::as_text)
            .unwrap_or_default()
    }

    pub fn set(&mut self, name: &str, value: DraftValue) {
        self.fields.insert(name.to_string(), value);
    }

    /// Set a field from raw input text
    pub fn set_input(&mut self, name: &str, input: &str) {
        let kind = field_spec(name).map(|spec| spec.kind).unwrap_or(FieldKind::Text);
        self.set(name, DraftValue::from_input(kind, input));
    }

    pub fn is_blank(&self, name: &str) -> bool {
        self.fields.get(name).map_or(true, DraftValue::is_blank)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DraftValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| {
                let kind = field_spec(k).map(|spec| spec.kind).unwrap_or(FieldKind::Text);
                (k.clone(), v.to_json(kind))
            })
            .collect();
        Value::Object(map)
    }
}

impl Default for ProtocolDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl From<BTreeMap<String, DraftValue>> for ProtocolDraft {
    fn from(values: BTreeMap<String, DraftValue>) -> Self {
        let mut draft = ProtocolDraft::new();
        for (name, value) in values {
            // A blank numeric field read from a file is stored as no number
            let value = match (field_spec(&name), value) {
                (Some(spec), DraftValue::Text(text)) => DraftValue::from_input(spec.kind, &text),
                (_, value) => value,
            };
            draft.fields.insert(name, value);
        }
        draft
    }
}

impl From<ProtocolDraft> for BTreeMap<String, DraftValue> {
    fn from(draft: ProtocolDraft) -> Self {
        draft.fields
    }
}

/// Payload of the analyze call
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    pub protocol: Value,
    pub use_function_calling: bool,
}

impl AnalysisRequest {
    pub fn from_draft(draft: &ProtocolDraft) -> Self {
        Self {
            protocol: draft.to_json(),
            use_function_calling: true,
        }
    }

    /// Fold PDF-extracted protocol data in; non-blank draft values win
    pub fn with_extracted(mut self, extracted: &Value) -> Self {
        let Value::Object(extracted) = extracted else {
            return self;
        };
        let draft = match std::mem::take(&mut self.protocol) {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let mut merged = extracted.clone();
        for (name, value) in draft {
            let blank = match &value {
                Value::Null => true,
                Value::String(s) => s.trim().is_empty(),
                _ => false,
            };
            if !blank || !merged.contains_key(&name) {
                merged.insert(name, value);
            }
        }
        self.protocol = Value::Object(merged);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_new_draft_has_default_for_every_field() {
        let draft = ProtocolDraft::new();
        for spec in PROTOCOL_FIELDS {
            let value = draft.get(spec.name).expect("field seeded");
            assert!(value.is_blank(), "{} should start blank", spec.name);
        }
        assert_eq!(draft.get("target_enrollment"), Some(&DraftValue::Number(None)));
        assert_eq!(draft.get("trial_name"), Some(&DraftValue::Text(String::new())));
    }

    #[test]
    fn test_blank_draft_serializes() {
        let json = ProtocolDraft::new().to_json();
        assert_eq!(json["trial_name"], json!(""));
        assert_eq!(json["duration_days"], Value::Null);
    }

    #[test]
    fn test_set_input_keeps_typed_text() {
        let mut draft = ProtocolDraft::new();
        draft.set_input("target_enrollment", "300");
        draft.set_input("duration_days", "");
        draft.set_input("alpha_level", "abc");
        draft.set_input("trial_name", "42");
        draft.set_input("expected_effect_size", "1e3");

        assert_eq!(draft.get("target_enrollment"), Some(&DraftValue::Text("300".to_string())));
        assert_eq!(draft.get("duration_days"), Some(&DraftValue::Number(None)));
        assert_eq!(draft.get("alpha_level"), Some(&DraftValue::Text("abc".to_string())));
        assert_eq!(draft.get("trial_name"), Some(&DraftValue::Text("42".to_string())));
        assert_eq!(draft.text("expected_effect_size"), "1e3");
    }

    #[test]
    fn test_numeric_fields_become_numbers_in_json() {
        let mut draft = ProtocolDraft::new();
        draft.set_input("target_enrollment", " 300 ");
        draft.set_input("alpha_level", "0.05");
        draft.set_input("dropout_rate", "abc");
        draft.set_input("trial_name", "42");

        let json = draft.to_json();
        assert_eq!(json["target_enrollment"], json!(300.0));
        assert_eq!(json["alpha_level"], json!(0.05));
        assert_eq!(json["dropout_rate"], json!("abc"));
        assert_eq!(json["trial_name"], json!("42"));
        assert_eq!(json["duration_days"], Value::Null);
    }

    #[test]
    fn test_number_display() {
        assert_eq!(DraftValue::Number(Some(300.0)).as_text(), "300");
        assert_eq!(DraftValue::Number(Some(0.05)).as_text(), "0.05");
        assert_eq!(DraftValue::Number(None).as_text(), "");
    }

    #[test]
    fn test_draft_deserializes_partial_file() {
        let draft: ProtocolDraft = serde_json::from_value(json!({
            "trial_name": "ASPIRE-3",
            "target_enrollment": "250",
            "duration_days": 180,
            "custom_note": "kept"
        }))
        .unwrap();

        assert_eq!(draft.text("trial_name"), "ASPIRE-3");
        assert_eq!(draft.text("target_enrollment"), "250");
        assert_eq!(draft.get("duration_days"), Some(&DraftValue::Number(Some(180.0))));
        assert_eq!(draft.to_json()["target_enrollment"], json!(250.0));
        assert_eq!(draft.text("custom_note"), "kept");
        assert!(draft.is_blank("phase"));
    }

    #[test]
    fn test_request_defaults_to_function_calling() {
        let mut draft = ProtocolDraft::new();
        draft.set_input("trial_name", "ASPIRE-3");
        let request = serde_json::to_value(AnalysisRequest::from_draft(&draft)).unwrap();

        assert_eq!(request["use_function_calling"], json!(true));
        assert_eq!(request["protocol"]["trial_name"], json!("ASPIRE-3"));
    }

    #[test]
    fn test_request_merges_extracted_data() {
        let mut draft = ProtocolDraft::new();
        draft.set_input("trial_name", "From Form");
        let extracted = json!({
            "trial_name": "From PDF",
            "phase": "Phase 3",
            "drug_profile": {"drug_class": "SSRI"}
        });

        let request = AnalysisRequest::from_draft(&draft).with_extracted(&extracted);

        assert_eq!(request.protocol["trial_name"], json!("From Form"));
        assert_eq!(request.protocol["phase"], json!("Phase 3"));
        assert_eq!(request.protocol["drug_profile"]["drug_class"], json!("SSRI"));
        assert_eq!(request.protocol["sponsor"], json!(""));
    }

    #[test]
    fn test_list_fields() {
        let lists: Vec<&str> = PROTOCOL_FIELDS
            .iter()
            .filter(|spec| spec.kind == FieldKind::List)
            .map(|spec| spec.name)
            .collect();
        assert_eq!(
            lists,
            vec![
                "secondary_endpoints",
                "inclusion_criteria",
                "exclusion_criteria",
                "known_contraindications"
            ]
        );
        assert_eq!(field_spec("description").map(|s| s.kind), Some(FieldKind::LongText));
    }

    #[test]
    fn test_step_index_round_trip() {
        for step in FormStep::ALL {
            assert_eq!(FormStep::from_index(step.index()), Some(step));
        }
        assert_eq!(FormStep::from_index(5), None);
    }
}
