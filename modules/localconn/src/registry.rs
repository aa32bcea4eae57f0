//! Callback registrations, keyed by event name.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::origin::OriginId;

/// Identity of a channel, handed to callbacks registered with the default
/// scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub name: String,
    pub origin: OriginId,
}

/// The context a callback is invoked with.
#[derive(Clone)]
pub enum Scope {
    /// The channel that received the event.
    Channel(Arc<ChannelInfo>),
    /// A caller-supplied value; read it back with [`Scope::value`].
    Value(Arc<dyn Any + Send + Sync>),
}

impl Scope {
    pub fn from_value<T: Any + Send + Sync>(value: T) -> Self {
        Scope::Value(Arc::new(value))
    }

    pub fn channel(&self) -> Option<&ChannelInfo> {
        match self {
            Scope::Channel(info) => Some(info.as_ref()),
            Scope::Value(_) => None,
        }
    }

    pub fn value<T: Any>(&self) -> Option<&T> {
        match self {
            Scope::Value(value) => value.downcast_ref::<T>(),
            Scope::Channel(_) => None,
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Channel(info) => f.debug_tuple("Channel").field(info).finish(),
            Scope::Value(_) => f.write_str("Value(..)"),
        }
    }
}

/// A handler for delivered events. Receives the registration's scope and the
/// token's args, in order.
///
/// Implemented for any `Fn(&Scope, &[String]) -> anyhow::Result<()>`.
pub trait Callback: Send + Sync {
    fn call(&self, scope: &Scope, args: &[String]) -> anyhow::Result<()>;
}

impl<F> Callback for F
where
    F: Fn(&Scope, &[String]) -> anyhow::Result<()> + Send + Sync,
{
    fn call(&self, scope: &Scope, args: &[String]) -> anyhow::Result<()> {
        self(scope, args)
    }
}

/// A callback paired with the scope it runs in.
#[derive(Clone)]
pub struct Handler {
    pub callback: Arc<dyn Callback>,
    pub scope: Scope,
}

/// Event name to ordered handlers.
pub struct Registry {
    default_scope: Scope,
    entries: HashMap<String, Vec<Handler>>,
}

impl Registry {
    pub fn new(default_scope: Scope) -> Self {
        Self {
            default_scope,
            entries: HashMap::new(),
        }
    }

    /// Append a handler for `event`. `None` scope means the channel itself.
    pub fn add(&mut self, event: &str, callback: Arc<dyn Callback>, scope: Option<Scope>) {
        let scope = scope.unwrap_or_else(|| self.default_scope.clone());
        self.entries
            .entry(event.to_string())
            .or_default()
            .push(Handler { callback, scope });
    }

    /// Drop every handler for `event`. Returns whether any existed.
    pub fn remove(&mut self, event: &str) -> bool {
        self.entries.remove(event).is_some()
    }

    pub fn contains(&self, event: &str) -> bool {
        self.entries.contains_key(event)
    }

    pub fn handler_count(&self, event: &str) -> usize {
        self.entries.get(event).map_or(0, Vec::len)
    }

    /// Snapshot of the handlers for `event`, in registration order.
    ///
    /// Cloned so callers can release any lock around the registry before
    /// invoking them; a callback may then add or remove registrations.
    pub fn handlers(&self, event: &str) -> Option<Vec<Handler>> {
        self.entries.get(event).cloned()
    }
}
