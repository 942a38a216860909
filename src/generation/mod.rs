// src/generation/mod.rs

//! Exam code generation: stratified sampling, shuffling, batch assembly.

pub mod assembler;
pub mod paper;
pub mod sampler;
pub mod shuffle;

pub use assembler::{ExamCodeGenerator, assemble_variants, format_code};
pub use paper::{ExamPaper, render_paper};
