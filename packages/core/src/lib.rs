// ABOUTME: Core data model shared by every TrialGuard package
// ABOUTME: Protocol drafts, normalized analysis results and chat messages

pub mod analysis;
pub mod chat;
pub mod protocol;

// Re-export main types
pub use analysis::{
    AnalysisResult, CategoryBreakdown, Finding, HistoricalComparison, Priority, Recommendation,
    RiskLevel, Severity,
};
pub use chat::{ChatMessage, MessageRole};
pub use protocol::{
    field_spec, AnalysisRequest, DraftValue, FieldKind, FieldSpec, FormStep, ProtocolDraft,
    PROTOCOL_FIELDS,
};
