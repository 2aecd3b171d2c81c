//! Source Registry Interfaces
//!
//! The registry supplies the current record of a source; the notifier
//! tracks which listeners want to hear about changes to which source.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Current value and attributes of a source as held by the registry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Raw state string
    pub value: String,
    /// Descriptive attributes (unit, device class, ...)
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl SourceRecord {
    /// Create a record without attributes
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Add an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Read access to the current record of each source
pub trait Registry {
    /// Current record, or `None` when the registry knows nothing about `source`
    fn get(&self, source: &str) -> Option<&SourceRecord>;
}

/// Identifies the party to notify when a source changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ListenerId(pub usize);

/// Handle returned by [`Notifier::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// Change subscription bookkeeping
pub trait Notifier {
    /// Register `listener` for changes to `source`
    fn subscribe(&mut self, source: &str, listener: ListenerId) -> SubscriptionId;

    /// Cancel a subscription. Returns false if it was not active.
    fn unsubscribe(&mut self, subscription: SubscriptionId) -> bool;
}

/// In-memory registry with change subscriptions
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    /// Current records by source id
    records: HashMap<String, SourceRecord>,
    /// Active subscriptions, in subscription order
    subscriptions: BTreeMap<SubscriptionId, (String, ListenerId)>,
    /// Next subscription id
    next_subscription: u64,
}

impl MemoryRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record and return the listeners to notify
    pub fn set(&mut self, source: &str, record: SourceRecord) -> Vec<ListenerId> {
        debug!("Source '{}' set to '{}'", source, record.value);
        self.records.insert(source.to_string(), record);
        self.listeners_for(source)
    }

    /// Drop a record and return the listeners to notify
    pub fn remove(&mut self, source: &str) -> Vec<ListenerId> {
        if self.records.remove(source).is_none() {
            return Vec::new();
        }
        debug!("Source '{}' removed", source);
        self.listeners_for(source)
    }

    /// Listeners subscribed to `source`, each listed once
    pub fn listeners_for(&self, source: &str) -> Vec<ListenerId> {
        let mut listeners: Vec<ListenerId> = Vec::new();
        for (subscribed, listener) in self.subscriptions.values() {
            if subscribed == source && !listeners.contains(listener) {
                listeners.push(*listener);
            }
        }
        listeners
    }

    /// Number of active subscriptions
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records are stored
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Registry for MemoryRegistry {
    fn get(&self, source: &str) -> Option<&SourceRecord> {
        self.records.get(source)
    }
}

impl Notifier for MemoryRegistry {
    fn subscribe(&mut self, source: &str, listener: ListenerId) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscriptions.insert(id, (source.to_string(), listener));
        id
    }

    fn unsubscribe(&mut self, subscription: SubscriptionId) -> bool {
        self.subscriptions.remove(&subscription).is_some()
    }
}
