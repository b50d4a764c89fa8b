//! Rank prediction engine for competitive exams.
//!
//! Maps a raw score to a predicted rank through per-exam calibration tables
//! (with a power-law fallback), then derives subject ranks, confidence bands,
//! multi-month trajectories, and what-if improvement scenarios. The engine is
//! pure and synchronous; the HTTP surface lives in the `rankcast-api` service.

pub mod catalog;
pub mod config;
pub mod error;
pub mod prediction;
pub mod telemetry;
