//! Channel subscription registry
//!
//! Maps a channel name to exactly one delivery callback. Registering a
//! second callback for a channel replaces the first; there is no fan-out.
//! Safe to mutate concurrently with dispatch: callbacks are cloned out of
//! the lock before they run.

use crate::types::InboundMessage;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Delivery callback for a channel
pub type ChannelHandler = Arc<dyn Fn(InboundMessage) + Send + Sync>;

/// Channel → callback mapping shared by the connection manager and its consumers
#[derive(Default)]
pub struct SubscriptionRegistry {
    handlers: RwLock<HashMap<String, ChannelHandler>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` as the sole handler for `channel`
    ///
    /// Returns true if a previous handler was replaced.
    pub fn subscribe(
        &self,
        channel: impl Into<String>,
        handler: impl Fn(InboundMessage) + Send + Sync + 'static,
    ) -> bool {
        let channel = channel.into();
        let replaced = self
            .write()
            .insert(channel.clone(), Arc::new(handler))
            .is_some();

        tracing::info!(channel = %channel, replaced, "Channel subscribed");
        replaced
    }

    /// Remove the handler for `channel`; no-op if none registered
    ///
    /// Returns true if a handler was removed.
    pub fn unsubscribe(&self, channel: &str) -> bool {
        let removed = self.write().remove(channel).is_some();
        if removed {
            tracing::info!(channel = %channel, "Channel unsubscribed");
        }
        removed
    }

    /// Deliver a message to the handler registered for its exact channel
    ///
    /// Messages for unregistered channels are dropped. Returns true if a
    /// handler ran.
    pub fn dispatch(&self, message: InboundMessage) -> bool {
        let handler = self.read().get(&message.channel).cloned();

        match handler {
            Some(handler) => {
                tracing::debug!(channel = %message.channel, kind = ?message.kind, "Dispatching message");
                handler(message);
                true
            }
            None => {
                tracing::debug!(channel = %message.channel, "No subscriber for channel, dropping message");
                false
            }
        }
    }

    pub fn is_subscribed(&self, channel: &str) -> bool {
        self.read().contains_key(channel)
    }

    pub fn channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.read().keys().cloned().collect();
        channels.sort();
        channels
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // Handlers never run under the lock; a poisoned map is still consistent.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, ChannelHandler>> {
        self.handlers.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, ChannelHandler>> {
        self.handlers.write().unwrap_or_else(|e| e.into_inner())
    }
}
