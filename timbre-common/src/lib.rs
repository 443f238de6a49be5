//! # Timbre Common Library
//!
//! Shared code for the timbre preset-matching services:
//! - Error taxonomy
//! - Root folder and configuration file resolution
//! - Descriptor tag normalization and tokenization

pub mod config;
pub mod error;
pub mod tags;

pub use error::{Error, Result};
