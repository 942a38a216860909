// src/grading/mod.rs

//! Auto-grading of submissions and manual score overrides.

pub mod grader;
pub mod scoring;
pub mod service;

pub use scoring::ScoringStrategy;
pub use service::SubmissionGrader;
