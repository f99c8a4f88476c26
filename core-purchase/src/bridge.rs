//! # Purchase Completion Bridge
//!
//! Answers native purchase and restore requests through the registered
//! [`PurchaseController`], reporting exactly one result per request.
//!
//! ## Rules
//!
//! - No controller: the request is left unanswered and the native SDK's own
//!   timeout applies.
//! - Controller error or panic: reported as `failed`, with the error text or the
//!   `purchase_failed` / `restore_failed` fallback.
//! - A request id already being handled for the same flow is ignored. Purchase
//!   and restore ids are tracked separately.
//! - A failing completion call is logged and not retried.

use crate::controller::{CompletionReporter, PurchaseController};
use crate::error::{PurchaseBridgeError, Result};
use bridge_traits::purchase::{PurchaseRequest, PurchaseResult, RestoreRequest, RestoreResult};
use futures::FutureExt;
use std::collections::HashSet;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, error, info, instrument, warn};

pub const PURCHASE_FAILED_FALLBACK: &str = "purchase_failed";
pub const RESTORE_FAILED_FALLBACK: &str = "restore_failed";

fn lock_set(set: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    set.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Request id claimed for the duration of one handler run.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<String>>,
    request_id: String,
}

impl<'a> InFlight<'a> {
    fn claim(set: &'a Mutex<HashSet<String>>, request_id: &str) -> Option<Self> {
        if !lock_set(set).insert(request_id.to_string()) {
            return None;
        }
        Some(Self {
            set,
            request_id: request_id.to_string(),
        })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock_set(self.set).remove(&self.request_id);
    }
}

fn failure_message(err: &anyhow::Error, fallback: &str) -> String {
    let message = err.to_string();
    if message.is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

fn purchase_outcome(result: &PurchaseResult) -> &'static str {
    match result {
        PurchaseResult::Success(_) => "success",
        PurchaseResult::Cancelled => "cancelled",
        PurchaseResult::Pending => "pending",
        PurchaseResult::Failed { .. } => "failed",
    }
}

fn restore_outcome(result: &RestoreResult) -> &'static str {
    match result {
        RestoreResult::Success { .. } => "success",
        RestoreResult::NoPurchases => "no_purchases",
        RestoreResult::Failed { .. } => "failed",
    }
}

#[derive(Default)]
pub struct PurchaseBridge {
    controller: RwLock<Option<Arc<dyn PurchaseController>>>,
    purchases_in_flight: Mutex<HashSet<String>>,
    restores_in_flight: Mutex<HashSet<String>>,
}

impl PurchaseBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install or clear the controller. Requests already being handled keep
    /// the controller they started with.
    pub fn set_controller(&self, controller: Option<Arc<dyn PurchaseController>>) {
        let mut slot = self
            .controller
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = controller;
    }

    pub fn controller(&self) -> Option<Arc<dyn PurchaseController>> {
        self.controller
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn has_controller(&self) -> bool {
        self.controller().is_some()
    }

    pub fn purchases_in_flight(&self) -> usize {
        lock_set(&self.purchases_in_flight).len()
    }

    pub fn restores_in_flight(&self) -> usize {
        lock_set(&self.restores_in_flight).len()
    }

    /// Run the controller for a native purchase request and report the result.
    ///
    /// Returns the reported result.
    #[instrument(skip_all, fields(request_id = %request.request_id, product_id = %request.product_id))]
    pub async fn handle_purchase<R>(
        &self,
        reporter: &R,
        request: PurchaseRequest,
    ) -> Result<PurchaseResult>
    where
        R: CompletionReporter + ?Sized,
    {
        let Some(controller) = self.controller() else {
            debug!("No purchase controller registered, leaving request unanswered");
            return Err(PurchaseBridgeError::NoController);
        };
        let Some(_claim) = InFlight::claim(&self.purchases_in_flight, &request.request_id) else {
            warn!("Duplicate purchase request ignored");
            return Err(PurchaseBridgeError::AlreadyInFlight {
                flow: "purchase",
                request_id: request.request_id.clone(),
            });
        };

        let result = match AssertUnwindSafe(controller.on_purchase(&request))
            .catch_unwind()
            .await
        {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                warn!(error = %err, "Purchase controller failed");
                PurchaseResult::failed(failure_message(&err, PURCHASE_FAILED_FALLBACK))
            }
            Err(_) => {
                error!("Purchase controller panicked");
                PurchaseResult::failed(PURCHASE_FAILED_FALLBACK)
            }
        };

        info!(outcome = purchase_outcome(&result), "Completing purchase");
        if let Err(err) = reporter
            .report_purchase(&request.request_id, result.clone())
            .await
        {
            error!(error = %err, "Failed to complete purchase");
            return Err(PurchaseBridgeError::CompletionFailed {
                request_id: request.request_id.clone(),
                message: err.to_string(),
            });
        }
        Ok(result)
    }

    /// Run the controller for a native restore request and report the result.
    #[instrument(skip_all, fields(request_id = %request.request_id))]
    pub async fn handle_restore<R>(
        &self,
        reporter: &R,
        request: RestoreRequest,
    ) -> Result<RestoreResult>
    where
        R: CompletionReporter + ?Sized,
    {
        let Some(controller) = self.controller() else {
            debug!("No purchase controller registered, leaving restore unanswered");
            return Err(PurchaseBridgeError::NoController);
        };
        let Some(_claim) = InFlight::claim(&self.restores_in_flight, &request.request_id) else {
            warn!("Duplicate restore request ignored");
            return Err(PurchaseBridgeError::AlreadyInFlight {
                flow: "restore",
                request_id: request.request_id.clone(),
            });
        };

        let result = match AssertUnwindSafe(controller.on_restore(&request))
            .catch_unwind()
            .await
        {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                warn!(error = %err, "Restore controller failed");
                RestoreResult::failed(failure_message(&err, RESTORE_FAILED_FALLBACK))
            }
            Err(_) => {
                error!("Restore controller panicked");
                RestoreResult::failed(RESTORE_FAILED_FALLBACK)
            }
        };

        info!(outcome = restore_outcome(&result), "Completing restore");
        if let Err(err) = reporter
            .report_restore(&request.request_id, result.clone())
            .await
        {
            error!(error = %err, "Failed to complete restore");
            return Err(PurchaseBridgeError::CompletionFailed {
                request_id: request.request_id.clone(),
                message: err.to_string(),
            });
        }
        Ok(result)
    }
}

impl fmt::Debug for PurchaseBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PurchaseBridge")
            .field("has_controller", &self.has_controller())
            .field("purchases_in_flight", &self.purchases_in_flight())
            .field("restores_in_flight", &self.restores_in_flight())
            .finish()
    }
}
