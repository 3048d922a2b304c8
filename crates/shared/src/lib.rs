//! Shared types and configuration for Tessera.
//!
//! This crate provides common types used across all other crates:
//! - Money type with integer minor-unit precision
//! - Typed IDs for type-safe entity references
//! - Configuration management

pub mod config;
pub mod types;

pub use config::AppConfig;
