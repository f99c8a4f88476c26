//! # Purchase & Restore Completion
//!
//! Bridges native purchase and restore requests to a host-supplied
//! [`PurchaseController`] and reports exactly one result back per request.
//!
//! ## Overview
//!
//! The native SDK pushes `onPurchaseRequest` / `onRestoreRequest` events when it
//! needs the host's store integration, then waits for a single completion call
//! keyed by the request identifier. [`PurchaseBridge`] owns the controller slot
//! and turns controller outcomes (including errors and panics) into the
//! [`PurchaseResult`] / [`RestoreResult`] that completes the request.

pub mod bridge;
pub mod controller;
pub mod error;

pub use bridge::{PurchaseBridge, PURCHASE_FAILED_FALLBACK, RESTORE_FAILED_FALLBACK};
pub use bridge_traits::purchase::{
    PurchaseRequest, PurchaseResult, PurchaseSuccess, RestoreRequest, RestoreResult,
};
pub use controller::{CompletionReporter, PurchaseController};
pub use error::{PurchaseBridgeError, Result};
