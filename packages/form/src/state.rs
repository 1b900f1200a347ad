// ABOUTME: State machine behind the multi-step protocol form
// ABOUTME: Holds the draft, touched fields, error map and the current step

use std::collections::{HashMap, HashSet};

use tracing::debug;
use trialguard_core::{AnalysisRequest, DraftValue, FieldSpec, FormStep, ProtocolDraft, PROTOCOL_FIELDS};

use crate::rules::{rule_for, FIELD_RULES};

/// Number of logical steps: basic, design, population, statistics, safety
pub const STEP_COUNT: usize = FormStep::ALL.len();

/// Multi-step protocol form.
///
/// Errors are computed lazily: on blur of a single field or on a full
/// [`validate_form`](ProtocolForm::validate_form) pass. Editing a field drops
/// its error straight away, valid or not, and it only comes back on the next
/// blur or submit attempt.
#[derive(Debug, Clone)]
pub struct ProtocolForm {
    draft: ProtocolDraft,
    current_step: usize,
    validation_errors: HashMap<String, String>,
    touched: HashSet<String>,
    is_valid: bool,
}

impl ProtocolForm {
    pub fn new() -> Self {
        Self::with_draft(ProtocolDraft::new())
    }

    /// Start from an existing draft (e.g. loaded from disk); nothing is touched
    pub fn with_draft(draft: ProtocolDraft) -> Self {
        Self {
            draft,
            current_step: 0,
            validation_errors: HashMap::new(),
            touched: HashSet::new(),
            is_valid: true,
        }
    }

    pub fn draft(&self) -> &ProtocolDraft {
        &self.draft
    }

    pub fn value(&self, name: &str) -> String {
        self.draft.text(name)
    }

    /// Set a field from raw input text
    pub fn set_field(&mut self, name: &str, input: &str) {
        self.draft.set_input(name, input);
        // Clear validation error when field is updated
        self.validation_errors.remove(name);
    }

    /// Set a field from an already-typed value
    pub fn set_value(&mut self, name: &str, value: DraftValue) {
        self.draft.set(name, value);
        self.validation_errors.remove(name);
    }

    /// Mark a field touched and run its rule, if it has one
    pub fn blur_field(&mut self, name: &str) -> bool {
        self.touched.insert(name.to_string());
        self.check_field(name)
    }

    /// Re-run every declared rule regardless of touched state.
    /// Replaces the whole error map; returns whether the form may be submitted.
    pub fn validate_form(&mut self) -> bool {
        let mut errors = HashMap::new();
        for rule in FIELD_RULES {
            if let Err(message) = (rule.validator)(&self.draft.text(rule.field)) {
                errors.insert(rule.field.to_string(), message);
            }
            // A submit attempt surfaces every latent error
            self.touched.insert(rule.field.to_string());
        }

        self.is_valid = errors.is_empty();
        if !self.is_valid {
            debug!(error_count = errors.len(), "Protocol form failed validation");
        }
        self.validation_errors = errors;
        self.is_valid
    }

    /// Validate the fields of the current step only
    pub fn validate_current_step(&mut self) -> bool {
        let names: Vec<&'static str> = self
            .current_step_fields()
            .into_iter()
            .map(|spec| spec.name)
            .collect();

        let mut all_valid = true;
        for name in names {
            if !self.blur_field(name) {
                all_valid = false;
            }
        }
        all_valid
    }

    /// Error to display for a field: only once the field has been touched
    pub fn field_error(&self, name: &str) -> Option<&str> {
        if !self.touched.contains(name) {
            return None;
        }
        self.validation_errors.get(name).map(String::as_str)
    }

    pub fn validation_errors(&self) -> &HashMap<String, String> {
        &self.validation_errors
    }

    pub fn is_touched(&self, name: &str) -> bool {
        self.touched.contains(name)
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Current step index; may exceed the last step once the caller submits
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn step(&self) -> Option<FormStep> {
        FormStep::from_index(self.current_step)
    }

    pub fn total_steps(&self) -> usize {
        STEP_COUNT
    }

    /// Advance one step. Not clamped: moving past the last step means submit.
    pub fn next_step(&mut self) {
        self.current_step += 1;
    }

    pub fn previous_step(&mut self) {
        self.current_step = self.current_step.saturating_sub(1);
    }

    pub fn go_to_step(&mut self, step: usize) {
        self.current_step = step;
    }

    pub fn is_last_step(&self) -> bool {
        self.current_step == STEP_COUNT - 1
    }

    /// True once navigation has moved beyond the final step
    pub fn should_submit(&self) -> bool {
        self.current_step >= STEP_COUNT
    }

    pub fn current_step_fields(&self) -> Vec<&'static FieldSpec> {
        match self.step() {
            Some(step) => PROTOCOL_FIELDS.iter().filter(|spec| spec.step == step).collect(),
            None => Vec::new(),
        }
    }

    /// Back to the initial state: step 0, default values, nothing touched
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn to_request(&self) -> AnalysisRequest {
        AnalysisRequest::from_draft(&self.draft)
    }

    fn check_field(&mut self, name: &str) -> bool {
        let Some(validator) = rule_for(name) else {
            self.validation_errors.remove(name);
            return true;
        };

        match validator(&self.draft.text(name)) {
            Ok(()) => {
                self.validation_errors.remove(name);
                true
            }
            Err(message) => {
                self.validation_errors.insert(name.to_string(), message);
                false
            }
        }
    }
}

impl Default for ProtocolForm {
    fn default() -> Self {
        Self::new()
    }
}
