use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use stomp_engine::{IdGenerator, SubscribeError, Subscription, SubscriptionRegistry};

#[derive(Debug, Default)]
struct Sequential(AtomicUsize);

impl IdGenerator for Sequential {
    fn generate_id(&self) -> String {
        format!("sub-{}", self.0.fetch_add(1, Ordering::SeqCst))
    }
}

#[test]
fn subscribe_returns_fresh_ids() {
    let registry = SubscriptionRegistry::with_id_generator(Sequential::default());
    assert_eq!(registry.subscribe("/a").unwrap(), "sub-0");
    assert_eq!(registry.subscribe("/b").unwrap(), "sub-1");
    assert_eq!(registry.subscription_id("/a").as_deref(), Some("sub-0"));
    assert_eq!(registry.len(), 2);
}

#[test]
fn duplicate_destination_is_rejected() {
    let registry = SubscriptionRegistry::new();
    let id = registry.subscribe("/a").unwrap();
    assert_eq!(
        registry.subscribe("/a"),
        Err(SubscribeError::AlreadySubscribed("/a".to_string()))
    );
    // the original registration is untouched
    assert_eq!(registry.subscription_id("/a"), Some(id));
    assert_eq!(registry.len(), 1);
}

#[test]
fn default_ids_are_unique_and_not_the_destination() {
    let registry = SubscriptionRegistry::new();
    let ids: HashSet<String> = (0..100)
        .map(|i| registry.subscribe(&format!("/topic/{}", i)).unwrap())
        .collect();
    assert_eq!(ids.len(), 100);
    assert!(!ids.contains("/topic/0"));
}

#[test]
fn unsubscribe_returns_id_once() {
    let registry = SubscriptionRegistry::new();
    let id = registry.subscribe("/a").unwrap();
    assert_eq!(registry.unsubscribe("/a"), Some(id));
    assert_eq!(registry.unsubscribe("/a"), None);
    assert_eq!(registry.unsubscribe("/never"), None);
    assert!(registry.is_empty());
}

#[test]
fn resubscribe_after_unsubscribe_gets_new_id() {
    let registry = SubscriptionRegistry::with_id_generator(Sequential::default());
    registry.subscribe("/a").unwrap();
    registry.unsubscribe("/a");
    assert_eq!(registry.subscribe("/a").unwrap(), "sub-1");
}

#[test]
fn clear_empties_everything() {
    let registry = SubscriptionRegistry::new();
    registry.subscribe("/a").unwrap();
    registry.subscribe("/b").unwrap();
    registry.clear();
    assert!(registry.is_empty());
    assert!(!registry.contains("/a"));
}

#[test]
fn snapshot_is_sorted_by_destination() {
    let registry = SubscriptionRegistry::with_id_generator(Sequential::default());
    registry.subscribe("/z").unwrap();
    registry.subscribe("/a").unwrap();
    assert_eq!(registry.destinations(), vec!["/a".to_string(), "/z".to_string()]);
    assert_eq!(
        registry.snapshot(),
        vec![
            Subscription {
                destination: "/a".into(),
                subscription_id: "sub-1".into()
            },
            Subscription {
                destination: "/z".into(),
                subscription_id: "sub-0".into()
            },
        ]
    );
}

#[test]
fn concurrent_subscribers_get_exactly_one_registration() {
    let registry = Arc::new(SubscriptionRegistry::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = registry.clone();
            std::thread::spawn(move || registry.subscribe("/contended").is_ok())
        })
        .collect();
    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();
    assert_eq!(winners, 1);
    assert_eq!(registry.len(), 1);
}
