//! Client façade of the Nuxie native bridge.
//!
//! This crate composes the trigger state machine (`core-trigger`), the purchase
//! completion bridge (`core-purchase`) and the runtime infrastructure
//! (`core-runtime`) behind [`NuxieClient`]. The platform binding supplies the
//! native module through a [`ModuleResolver`]; nothing here knows how the
//! handle was obtained.

pub mod client;
pub mod error;
pub mod options;
pub mod resolver;
pub mod router;

pub use client::NuxieClient;
pub use error::{ClientError, Result, MISSING_API_KEY_MESSAGE};
pub use options::{FeatureQuery, FeatureUsage, IdentifyOptions};
pub use resolver::{fixed_module, ModuleResolver};
pub use router::EventRouter;

pub use core_purchase::{PurchaseController, PurchaseRequest, PurchaseResult, PurchaseSuccess, RestoreRequest, RestoreResult};
pub use core_runtime::config::{ClientSettings, ConfigureOptions, WRAPPER_VERSION};
pub use core_runtime::events::{EventKind, EventStream, ListenerHandle};
pub use core_trigger::{codes, TerminalUpdate, TriggerDone, TriggerOperation, UpdateHandle};
