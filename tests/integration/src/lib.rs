//! Integration test utilities for the chat client
//!
//! This crate provides a harness that wires the services to the in-memory
//! backend with a manual clock, plus fixtures and wait helpers.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
