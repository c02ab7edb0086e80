//! Route handlers

pub mod alerts;
pub mod analytics;
pub mod batteries;
pub mod stats;
