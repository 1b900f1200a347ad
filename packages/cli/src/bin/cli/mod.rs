pub mod analyze;
pub mod chat;
pub mod report;
pub mod saved;
pub mod trials;
pub mod utils;
