// ABOUTME: Client for the TrialGuard protocol analysis backend
// ABOUTME: SSE assembly, normalization, PDF extraction, chat sessions and history lookups

pub mod assembler;
pub mod chat_session;
pub mod config;
pub mod error;
pub mod normalize;
pub mod service;
pub mod sse;
pub mod types;

pub use assembler::{AnalysisAssembler, ProgressUpdate};
pub use chat_session::{ChatBackend, ChatCancelHandle, ChatSession};
pub use config::{ClientConfig, ConfigError};
pub use error::{upstream_error_message, ClientError, ClientResult};
pub use normalize::{map_priority, map_severity, normalize_analysis};
pub use service::{validate_pdf_upload, TrialGuardClient};
pub use types::{
    ChatRequest, HistoricalTrial, ProtocolValidation, SavedAnalysisSummary, SearchQuery,
    TrialQuery, ValidationIssue,
};
