//! Workspace placeholder crate.
//!
//! Host applications depend on `nuxie-bridge` and get the client façade from
//! `core-service` without wiring the individual workspace crates. Everything
//! below is a re-export.

pub use core_service::*;
