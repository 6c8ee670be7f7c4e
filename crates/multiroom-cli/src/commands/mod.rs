//! CLI command implementations.

pub mod cascade;
pub mod common;
pub mod graph;
pub mod plan;
pub mod resolve;
pub mod simulate;
pub mod sources;
pub mod validate;
