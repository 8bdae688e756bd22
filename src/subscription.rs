use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use uuid::Uuid;

/// Source of subscription ids.
pub trait IdGenerator: Send + Sync + fmt::Debug {
    fn generate_id(&self) -> String;
}

/// Random v4 UUIDs; unrelated to the destination they are issued for.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Returned when a destination already has an active subscription.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscribeError {
    #[error("already subscribed to '{0}'")]
    AlreadySubscribed(String),
}

/// One active registration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    pub destination: String,
    pub subscription_id: String,
}

/// Destination → subscription-id bookkeeping.
///
/// At most one subscription exists per destination. All methods take
/// `&self` and are safe to call from any thread.
#[derive(Debug)]
pub struct SubscriptionRegistry {
    entries: Mutex<HashMap<String, String>>,
    ids: Box<dyn IdGenerator>,
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::with_id_generator(UuidGenerator)
    }

    pub fn with_id_generator(ids: impl IdGenerator + 'static) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ids: Box::new(ids),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `destination` under a fresh id and return the id.
    pub fn subscribe(&self, destination: &str) -> Result<String, SubscribeError> {
        let mut entries = self.entries();
        if entries.contains_key(destination) {
            return Err(SubscribeError::AlreadySubscribed(destination.to_string()));
        }
        let id = self.ids.generate_id();
        entries.insert(destination.to_string(), id.clone());
        Ok(id)
    }

    /// Remove `destination`, returning the id it was registered under.
    pub fn unsubscribe(&self, destination: &str) -> Option<String> {
        self.entries().remove(destination)
    }

    /// Drop every registration.
    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn contains(&self, destination: &str) -> bool {
        self.entries().contains_key(destination)
    }

    pub fn subscription_id(&self, destination: &str) -> Option<String> {
        self.entries().get(destination).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Registered destinations, sorted.
    pub fn destinations(&self) -> Vec<String> {
        let mut destinations: Vec<String> = self.entries().keys().cloned().collect();
        destinations.sort();
        destinations
    }

    /// Point-in-time copy of every registration, sorted by destination.
    pub fn snapshot(&self) -> Vec<Subscription> {
        let mut subs: Vec<Subscription> = self
            .entries()
            .iter()
            .map(|(destination, id)| Subscription {
                destination: destination.clone(),
                subscription_id: id.clone(),
            })
            .collect();
        subs.sort_by(|a, b| a.destination.cmp(&b.destination));
        subs
    }
}
