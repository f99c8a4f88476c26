//! # Core Runtime Module
//!
//! Foundational infrastructure shared by the bridge crates:
//! - Logging and tracing setup
//! - Configure-options builder and client settings
//! - Event categories, general-purpose listeners and the broadcast event bus
//!
//! ## Overview
//!
//! Nothing in here knows about trigger lifecycles or purchase completion; those
//! live in `core-trigger` and `core-purchase`. This crate only provides the
//! conventions they log, configure and fan out events with.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
