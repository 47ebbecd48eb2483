//! # SPT Common Library
//!
//! Shared code for the Student Productivity Tracker:
//! - Record models persisted in the aggregate store
//! - Derived metrics (productivity scores, rankings, forecasts)
//! - Live fan-out hub (per-identity rooms)
//! - Configuration loading
//! - SSE helpers

pub mod config;
pub mod error;
pub mod events;
pub mod identity;
pub mod metrics;
pub mod models;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
pub use identity::Identity;
