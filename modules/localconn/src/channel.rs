//! The public channel handle.

use std::sync::{Arc, Mutex, MutexGuard};

use localconn_store::{Slot, SlotStore, StoreError};
use tracing::{info, warn};

use crate::codec::{check_reserved, encode};
use crate::config::{ChannelConfig, Consistency};
use crate::consume::{run_cycle, CycleReport, STRICT_REWRITE_ATTEMPTS};
use crate::error::{ChannelError, Result};
use crate::origin::OriginId;
use crate::poller::{self, PollHandle};
use crate::registry::{Callback, Scope};
use crate::state::ChannelState;

/// One participant on a shared slot.
///
/// Sends append tokens to the slot; the poller (or [`consume_once`]) picks up
/// tokens from other participants and runs the callbacks registered for
/// their event names. A participant never receives its own tokens.
///
/// [`consume_once`]: LocalConnection::consume_once
pub struct LocalConnection<S: SlotStore + 'static> {
    inner: Arc<Inner<S>>,
    poller: Mutex<Option<PollHandle>>,
}

struct Inner<S> {
    slot: Slot<S>,
    state: ChannelState,
    config: ChannelConfig,
    // One cycle or send at a time, whether from the poller or the caller.
    cycle_lock: tokio::sync::Mutex<()>,
}

impl<S: SlotStore + 'static> Inner<S> {
    async fn consume(&self) -> Result<CycleReport> {
        let _cycle = self.cycle_lock.lock().await;
        run_cycle(&self.slot, &self.state, self.config.consistency).await
    }
}

impl<S: SlotStore + 'static> LocalConnection<S> {
    /// Join the slot named by `config.name`.
    ///
    /// Erases whatever the slot held, including tokens other participants
    /// have not picked up yet. Starts polling unless `auto_listen` is off,
    /// which requires a tokio runtime.
    pub async fn connect(store: S, config: ChannelConfig) -> Result<Self> {
        if config.consistency == Consistency::Strict && !store.supports_compare_and_set() {
            return Err(StoreError::Unsupported("compare_and_set").into());
        }

        let origin = OriginId::generate();
        let slot = Slot::new(store, config.name.clone());
        slot.clear()
            .await
            .map_err(|e| ChannelError::from_write(slot.key(), e))?;

        info!(
            name = config.name.as_str(),
            origin = %origin,
            consistency = ?config.consistency,
            "Channel connected"
        );

        let auto_listen = config.auto_listen;
        let conn = Self {
            inner: Arc::new(Inner {
                state: ChannelState::new(config.name.clone(), origin),
                slot,
                config,
                cycle_lock: tokio::sync::Mutex::new(()),
            }),
            poller: Mutex::new(None),
        };

        if auto_listen {
            conn.listen();
        }
        Ok(conn)
    }

    pub fn origin(&self) -> OriginId {
        self.inner.state.origin()
    }

    pub fn name(&self) -> &str {
        self.inner.state.name()
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &S {
        self.inner.slot.store()
    }

    /// Post `event` with `args` to every other participant. Returns false if
    /// the store refused the write. True does not mean anyone received it.
    pub async fn send<A: AsRef<str>>(&self, event: &str, args: &[A]) -> bool {
        match self.try_send(event, args).await {
            Ok(()) => true,
            Err(e) => {
                warn!(event, error = %e, "Send failed");
                false
            }
        }
    }

    /// [`send`](Self::send) with the failure reason.
    ///
    /// Reserved delimiter characters are not rejected; receivers will drop or
    /// misparse the token. A warning is logged.
    pub async fn try_send<A: AsRef<str>>(&self, event: &str, args: &[A]) -> Result<()> {
        if let Err(e) = check_reserved(event, args) {
            warn!(event, error = %e, "Token will not decode as sent");
        }

        let token = encode(self.origin(), event, args);
        let slot = &self.inner.slot;
        // A cycle's rewrite would otherwise erase an append that lands
        // between its read and write.
        let _cycle = self.inner.cycle_lock.lock().await;

        match self.inner.config.consistency {
            Consistency::Weak => slot
                .append(&token)
                .await
                .map_err(|e| ChannelError::from_write(slot.key(), e)),
            Consistency::Strict => {
                let landed = slot
                    .append_exclusive(&token, STRICT_REWRITE_ATTEMPTS)
                    .await
                    .map_err(|e| ChannelError::from_write(slot.key(), e))?;
                if landed {
                    Ok(())
                } else {
                    Err(ChannelError::Contended {
                        key: slot.key().to_string(),
                        attempts: STRICT_REWRITE_ATTEMPTS,
                    })
                }
            }
        }
    }

    /// Register `callback` for `event`, invoked with this channel as scope.
    /// Handlers for one event run in registration order.
    pub fn add_callback<C: Callback + 'static>(&self, event: &str, callback: C) {
        self.inner
            .state
            .add_callback(event, Arc::new(callback), None);
    }

    /// Register `callback` for `event`, invoked with `scope`.
    pub fn add_callback_with_scope<C: Callback + 'static>(
        &self,
        event: &str,
        callback: C,
        scope: Scope,
    ) {
        self.inner
            .state
            .add_callback(event, Arc::new(callback), Some(scope));
    }

    /// Drop every callback for `event`. No-op if none are registered.
    pub fn remove_callback(&self, event: &str) {
        self.inner.state.remove_callback(event);
    }

    pub fn has_callbacks(&self, event: &str) -> bool {
        self.inner.state.has_callbacks(event)
    }

    /// Start polling. Does nothing if already polling.
    pub fn listen(&self) {
        let mut current = self.poller_slot();
        if current.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let inner = self.inner.clone();
        let interval = inner.config.poll_interval();
        *current = Some(poller::spawn(interval, move || {
            let inner = inner.clone();
            async move {
                if let Err(e) = inner.consume().await {
                    warn!(key = inner.slot.key(), error = %e, "Consume cycle failed");
                }
            }
        }));

        info!(
            name = self.name(),
            interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            "Listening"
        );
    }

    pub fn is_listening(&self) -> bool {
        self.poller_slot()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Stop polling. Waits for a cycle in progress; once this returns the
    /// poller makes no further store calls. `listen` may restart it.
    pub async fn stop(&self) {
        let handle = self.poller_slot().take();
        if let Some(handle) = handle {
            handle.stop().await;
            info!(name = self.name(), "Stopped listening");
        }
    }

    /// Run one consume cycle now.
    pub async fn consume_once(&self) -> Result<CycleReport> {
        self.inner.consume().await
    }

    fn poller_slot(&self) -> MutexGuard<'_, Option<PollHandle>> {
        self.poller
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
