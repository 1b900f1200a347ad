// ABOUTME: Form state engine for entering a clinical-trial protocol
// ABOUTME: Field values, lazy per-field validation and step navigation

pub mod prefill;
pub mod rules;
pub mod state;

pub use rules::{rule_for, FieldRule, Validator, FIELD_RULES};
pub use state::{ProtocolForm, STEP_COUNT};
