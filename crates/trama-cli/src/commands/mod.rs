//! CLI command implementations.

pub mod common;
pub mod config;
pub mod info;
pub mod nodes;
pub mod render;
