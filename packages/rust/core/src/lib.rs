//! Pipeline orchestration and domain logic for Narrator.
//!
//! This crate ties together content fetching, text cleanup, segmentation,
//! and keyword annotation into the end-to-end [`pipeline::Pipeline::run`].

pub mod annotate;
pub mod pipeline;

pub use pipeline::{Pipeline, ProgressReporter, RunReport, SilentProgress, Stage, Timeouts};
