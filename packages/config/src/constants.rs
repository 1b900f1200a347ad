// ABOUTME: Environment variable name constants
// ABOUTME: Centralized definitions of all environment variable names used across TrialGuard

// Backend API
pub const TRIALGUARD_API_URL: &str = "TRIALGUARD_API_URL";
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

// Upload limits
pub const TRIALGUARD_MAX_UPLOAD_MB: &str = "TRIALGUARD_MAX_UPLOAD_MB";
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 10;

// HTTP client timeouts
pub const TRIALGUARD_HTTP_TIMEOUT_SECS: &str = "TRIALGUARD_HTTP_TIMEOUT_SECS";
pub const TRIALGUARD_HTTP_CONNECT_TIMEOUT_SECS: &str = "TRIALGUARD_HTTP_CONNECT_TIMEOUT_SECS";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

// Logging
pub const RUST_LOG: &str = "RUST_LOG";
pub const DEFAULT_LOG_FILTER: &str = "info";
