//! # Trigger Operations
//!
//! Lifecycle of trigger requests sent to the native SDK.
//!
//! ## Overview
//!
//! A trigger is started with an event name and optional properties. The native
//! layer answers asynchronously with any number of [`TriggerUpdate`]s tagged
//! with the request identifier; the operation ends at the first terminal one.
//!
//! - [`TriggerManager::start`] mints a request id, registers the operation and
//!   returns a [`TriggerOperation`] before any native round trip
//! - [`TriggerRegistry::route`] correlates native updates back to operations
//! - [`TriggerOperation::done`] resolves exactly once with a [`TerminalUpdate`]
//! - Start failures and cancellation surface as terminal `error` updates, never
//!   as `Err`
//!
//! ## Usage
//!
//! ```ignore
//! let operation = manager.start("premium_tapped", None);
//! let _handle = operation.on_update(|update| println!("{}", update.kind()));
//! let terminal = operation.done().await;
//! ```

pub mod backend;
pub mod error;
pub mod id;
pub mod operation;
pub mod registry;
pub mod state;
pub mod update;

pub use backend::{StartGate, TriggerBackend, TriggerRequest};
pub use bridge_traits::trigger::{TriggerError, TriggerUpdate};
pub use error::{Error, Result};
pub use id::generate_request_id;
pub use operation::{TriggerDone, TriggerManager, TriggerOperation, UpdateHandle};
pub use registry::TriggerRegistry;
pub use state::{Delivery, UpdateListener};
pub use update::{codes, is_terminal, TerminalUpdate};
