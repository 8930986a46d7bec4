//! Host platform capabilities
//!
//! Optional host features are probed once and exposed as `Option` handles:
//! a capability is either present with a handle to drive it, or absent.

use crate::utils::Result;
use std::fmt;
use std::sync::Arc;

/// Host primitive that re-invokes a sync handler when connectivity returns
#[cfg_attr(test, mockall::automock)]
pub trait SyncManager: Send + Sync {
    /// Ask the host to fire a sync event with this tag later
    fn register(&self, tag: &str) -> Result<()>;
}

/// Capabilities the host offers
#[derive(Clone, Default)]
pub struct Capabilities {
    background_sync: Option<Arc<dyn SyncManager>>,
}

impl Capabilities {
    /// A host with no optional capabilities
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_background_sync(mut self, manager: Arc<dyn SyncManager>) -> Self {
        self.background_sync = Some(manager);
        self
    }

    /// Background sync handle, if the host provides one
    pub fn background_sync(&self) -> Option<&dyn SyncManager> {
        self.background_sync.as_deref()
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("background_sync", &self.background_sync.is_some())
            .finish()
    }
}
