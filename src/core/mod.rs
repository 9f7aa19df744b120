//! # Core Module
//!
//! Shared configuration for the keeper binary and library.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod config;

pub use config::Config;
