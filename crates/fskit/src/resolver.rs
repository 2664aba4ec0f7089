//! Driver resolution
//!
//! Detects the host platform once and lazily constructs exactly one driver
//! per process. The in-flight construction is memoized, so concurrent early
//! callers share the same instance instead of racing separate
//! initializations. No reconfiguration happens after first resolution.

use serde::Serialize;
use std::sync::{Arc, OnceLock};
use tokio::sync::OnceCell;

use crate::driver::{BackendInfo, BridgeDriver, BrowserStoreDriver, Driver, HostBridge};

/// Host environment a driver is selected for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Platform {
    /// Desktop/server process with a real OS filesystem.
    Native,
    /// WebView-hosted process with a registered [`HostBridge`].
    SandboxedHost,
    /// Browser sandbox with no filesystem of its own.
    Browser,
}

static HOST_BRIDGE: OnceLock<Arc<dyn HostBridge>> = OnceLock::new();
static DRIVER: OnceCell<Arc<dyn Driver>> = OnceCell::const_new();

/// Register the host's filesystem capability.
///
/// Must happen before first driver resolution to take effect; returns
/// `false` when a bridge was already registered.
pub fn set_host_bridge(bridge: Arc<dyn HostBridge>) -> bool {
    HOST_BRIDGE.set(bridge).is_ok()
}

/// Detect the host platform.
///
/// A registered bridge marks a sandboxed host on any architecture;
/// otherwise native builds get the OS filesystem and wasm builds the
/// browser store.
pub fn detect_platform() -> Platform {
    if HOST_BRIDGE.get().is_some() {
        return Platform::SandboxedHost;
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        Platform::Native
    }
    #[cfg(target_arch = "wasm32")]
    {
        Platform::Browser
    }
}

fn construct(platform: Platform) -> Arc<dyn Driver> {
    match platform {
        Platform::SandboxedHost => {
            let bridge = HOST_BRIDGE
                .get()
                .expect("sandboxed host platform implies a registered bridge")
                .clone();
            Arc::new(BridgeDriver::new(bridge))
        }
        #[cfg(not(target_arch = "wasm32"))]
        Platform::Native => Arc::new(crate::driver::NativeDriver::new()),
        _ => Arc::new(BrowserStoreDriver::new()),
    }
}

/// Shared process-wide driver for the detected platform.
pub async fn resolve_driver() -> Arc<dyn Driver> {
    DRIVER
        .get_or_init(|| async {
            let platform = detect_platform();
            tracing::debug!(?platform, "resolving filesystem driver");
            construct(platform)
        })
        .await
        .clone()
}

/// Diagnostics for the process-wide driver's backing storage.
pub async fn backend_info() -> BackendInfo {
    resolve_driver().await.backend_info().await
}
