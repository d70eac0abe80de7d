//! Observability utilities for policy function hosts.

#![warn(missing_docs, clippy::pedantic)]

pub mod tracing_support;

pub use tracing_support::{build_filter, init};
