//! services/api/src/lib.rs
//!
//! The dream journal API service: adapters for the core ports, configuration, and
//! the web layer. The `api` binary wires these together.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
