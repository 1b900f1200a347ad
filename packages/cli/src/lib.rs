// ABOUTME: Library half of the TrialGuard CLI
// ABOUTME: Dashboard rendering and logging setup shared by the binary and tests

pub mod dashboard;
pub mod logging;

pub use dashboard::render_dashboard;
pub use logging::init_logging;
