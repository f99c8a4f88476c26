//! Host-side purchase handling and the native completion seam.

use async_trait::async_trait;
use bridge_traits::error::BridgeError;
use bridge_traits::native::NativeModule;
use bridge_traits::purchase::{PurchaseRequest, PurchaseResult, RestoreRequest, RestoreResult};

/// Runs purchases and restores through the host app's own store integration.
///
/// Returning `Err` (or panicking) reports `failed` to the native SDK with the
/// error's display text as the message.
///
/// # Example
///
/// ```ignore
/// struct StoreController { store: Arc<Store> }
///
/// #[async_trait]
/// impl PurchaseController for StoreController {
///     async fn on_purchase(&self, request: &PurchaseRequest) -> anyhow::Result<PurchaseResult> {
///         let receipt = self.store.buy(&request.product_id).await?;
///         Ok(PurchaseResult::Success(
///             PurchaseSuccess::default().with_purchase_token(receipt.token),
///         ))
///     }
///
///     async fn on_restore(&self, _request: &RestoreRequest) -> anyhow::Result<RestoreResult> {
///         Ok(RestoreResult::NoPurchases)
///     }
/// }
/// ```
#[async_trait]
pub trait PurchaseController: Send + Sync {
    async fn on_purchase(&self, request: &PurchaseRequest) -> anyhow::Result<PurchaseResult>;

    async fn on_restore(&self, request: &RestoreRequest) -> anyhow::Result<RestoreResult>;
}

/// Reports purchase and restore outcomes back to the native SDK.
#[async_trait]
pub trait CompletionReporter: Send + Sync {
    async fn report_purchase(
        &self,
        request_id: &str,
        result: PurchaseResult,
    ) -> Result<(), BridgeError>;

    async fn report_restore(
        &self,
        request_id: &str,
        result: RestoreResult,
    ) -> Result<(), BridgeError>;
}

#[async_trait]
impl<T> CompletionReporter for T
where
    T: NativeModule + ?Sized,
{
    async fn report_purchase(
        &self,
        request_id: &str,
        result: PurchaseResult,
    ) -> Result<(), BridgeError> {
        self.complete_purchase(request_id, &result).await
    }

    async fn report_restore(
        &self,
        request_id: &str,
        result: RestoreResult,
    ) -> Result<(), BridgeError> {
        self.complete_restore(request_id, &result).await
    }
}
