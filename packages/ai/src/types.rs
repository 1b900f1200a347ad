use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of a chat turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
    pub context: Value,
}

/// Filters for the historical trials listing
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrialQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub therapeutic_area: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Filters for saved-analysis search
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// A trial from the historical database. Fields the client does not model
/// are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoricalTrial {
    pub nct_id: String,
    pub trial_name: String,
    pub phase: String,
    pub therapeutic_area: String,
    pub drug_class: String,
    pub outcome: String,
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Row of the saved analyses listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavedAnalysisSummary {
    pub analysis_id: String,
    pub trial_name: String,
    pub created_at: Option<String>,
    pub overall_score: Option<f64>,
    pub risk_level: Option<String>,
}

/// One `{field, message}` entry of a protocol validation report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

/// Server-side completeness check of a protocol
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolValidation {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    /// 0.0 to 1.0
    pub completeness_score: f64,
}

/// Reply of the PDF extraction endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ParsePdfResponse {
    pub protocol: Option<Value>,
    pub file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TrialLookupResponse {
    pub status: String,
    pub trial: Option<HistoricalTrial>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct SavedListResponse {
    pub analyses: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct SearchResponse {
    pub results: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct AnalysisLookupResponse {
    pub analysis: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ChatReply {
    pub response: Option<String>,
    pub message: Option<String>,
}
