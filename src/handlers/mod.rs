// src/handlers/mod.rs

pub mod exam_code;
pub mod grading;
