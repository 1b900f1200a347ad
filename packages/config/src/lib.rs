// ABOUTME: Configuration constants shared by every TrialGuard package
// ABOUTME: Environment variable names and their defaults

pub mod constants;

pub use constants::*;
