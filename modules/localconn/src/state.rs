//! Per-instance channel state: identity plus registrations.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::origin::OriginId;
use crate::registry::{Callback, ChannelInfo, Handler, Registry, Scope};

pub struct ChannelState {
    info: Arc<ChannelInfo>,
    registry: Mutex<Registry>,
}

impl ChannelState {
    pub fn new(name: impl Into<String>, origin: OriginId) -> Self {
        let info = Arc::new(ChannelInfo {
            name: name.into(),
            origin,
        });
        let registry = Registry::new(Scope::Channel(info.clone()));
        Self {
            info,
            registry: Mutex::new(registry),
        }
    }

    pub fn origin(&self) -> OriginId {
        self.info.origin
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn info(&self) -> &Arc<ChannelInfo> {
        &self.info
    }

    pub fn add_callback(&self, event: &str, callback: Arc<dyn Callback>, scope: Option<Scope>) {
        self.lock().add(event, callback, scope);
    }

    pub fn remove_callback(&self, event: &str) -> bool {
        self.lock().remove(event)
    }

    pub fn has_callbacks(&self, event: &str) -> bool {
        self.lock().contains(event)
    }

    /// Handlers for `event`, copied out so the lock is not held while they run.
    pub fn handlers(&self, event: &str) -> Option<Vec<Handler>> {
        self.lock().handlers(event)
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
