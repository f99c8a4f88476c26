//! Lazy, memoized resolution of the platform's native module.

use async_trait::async_trait;
use bridge_traits::error::BridgeError;
use bridge_traits::native::NativeModule;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Locates the native SDK module for the current platform.
///
/// Any `Fn() -> impl Future<Output = Result<Arc<dyn NativeModule>, BridgeError>>`
/// closure is a resolver.
#[async_trait]
pub trait ModuleResolver: Send + Sync {
    async fn resolve(&self) -> Result<Arc<dyn NativeModule>, BridgeError>;
}

#[async_trait]
impl<F, Fut> ModuleResolver for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Arc<dyn NativeModule>, BridgeError>> + Send + 'static,
{
    async fn resolve(&self) -> Result<Arc<dyn NativeModule>, BridgeError> {
        (self)().await
    }
}

/// Resolver that always hands out the same, already constructed module.
pub fn fixed_module(module: Arc<dyn NativeModule>) -> Arc<dyn ModuleResolver> {
    Arc::new(move || {
        let module = Arc::clone(&module);
        async move { Ok::<_, BridgeError>(module) }
    })
}

/// Resolves the module at most once successfully; failures are retried on the
/// next call.
pub(crate) struct ModuleSlot {
    resolver: Arc<dyn ModuleResolver>,
    module: OnceCell<Arc<dyn NativeModule>>,
}

impl ModuleSlot {
    pub(crate) fn new(resolver: Arc<dyn ModuleResolver>) -> Self {
        Self {
            resolver,
            module: OnceCell::new(),
        }
    }

    pub(crate) async fn get(&self) -> Result<Arc<dyn NativeModule>, BridgeError> {
        self.module
            .get_or_try_init(|| async {
                debug!("Resolving native module");
                self.resolver.resolve().await.map_err(|err| {
                    warn!(error = %err, "Native module resolution failed");
                    err
                })
            })
            .await
            .map(Arc::clone)
    }

    pub(crate) fn is_resolved(&self) -> bool {
        self.module.initialized()
    }
}
