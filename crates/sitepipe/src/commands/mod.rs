//! CLI command implementations.

pub mod build;
pub mod run;
pub mod tasks;
pub mod watchapp;
