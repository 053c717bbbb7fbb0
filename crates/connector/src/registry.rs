//! The local subscription registry.
//!
//! Populated by [`crate::ConnectorBuilder`] during registration, then moved
//! behind an `Arc` by [`crate::ConnectorBuilder::start`]. Nothing mutates it
//! after that point, so concurrent deliveries read it without locking.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::{ActionFilter, ConnectorError, ConnectorInstanceId, ResourceGid, Subscription, SubscriptionId};

/// Subscriptions in registration order, with unique ids.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    subscriptions: Vec<Subscription>,
    /// Position of each id in `subscriptions`.
    index: HashMap<SubscriptionId, usize>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subscription at the end of the registration order.
    ///
    /// # Errors
    ///
    /// [`ConnectorError::DuplicateSubscription`] if the id is taken.
    pub fn insert(&mut self, subscription: Subscription) -> Result<(), ConnectorError> {
        match self.index.entry(subscription.id.clone()) {
            Entry::Occupied(_) => Err(ConnectorError::DuplicateSubscription {
                id: subscription.id,
            }),
            Entry::Vacant(slot) => {
                slot.insert(self.subscriptions.len());
                self.subscriptions.push(subscription);
                Ok(())
            }
        }
    }

    pub fn get(&self, id: &SubscriptionId) -> Option<&Subscription> {
        self.index.get(id).map(|&position| &self.subscriptions[position])
    }

    pub fn contains(&self, id: &SubscriptionId) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subscription> {
        self.subscriptions.iter()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Subscriptions whose filter accepts `action`, in registration order.
    ///
    /// Resource ids are not compared: which webhook delivered the batch
    /// already scopes it.
    pub fn matching<'a>(&'a self, action: &'a str) -> impl Iterator<Item = &'a Subscription> + 'a {
        self.subscriptions
            .iter()
            .filter(move |s| s.filter.matches(action))
    }
}

/// Id given to a subscription registered without one.
pub fn default_subscription_id(
    webhook_path: &str,
    resource: &ResourceGid,
    filter: ActionFilter,
    instance: ConnectorInstanceId,
) -> SubscriptionId {
    SubscriptionId::new(format!("Asana{webhook_path}/{resource}/{filter}/{instance}"))
        .expect("synthesised id is never empty")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChangeAction;

    fn subscription(id: &str, filter: ActionFilter) -> Subscription {
        Subscription {
            id: SubscriptionId::new(id).unwrap(),
            resource: ResourceGid::new("r1").unwrap(),
            filter,
        }
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut registry = SubscriptionRegistry::new();
        registry.insert(subscription("s1", ActionFilter::Any)).unwrap();

        let err = registry
            .insert(subscription("s1", ActionFilter::Only(ChangeAction::Added)))
            .unwrap_err();
        assert!(matches!(err, ConnectorError::DuplicateSubscription { id } if id.as_str() == "s1"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn get_finds_each_subscription_by_id() {
        let mut registry = SubscriptionRegistry::new();
        registry.insert(subscription("s1", ActionFilter::Any)).unwrap();
        registry
            .insert(subscription("s2", ActionFilter::Only(ChangeAction::Deleted)))
            .unwrap();

        let s2 = SubscriptionId::new("s2").unwrap();
        assert!(registry.contains(&s2));
        assert_eq!(
            registry.get(&s2).map(|s| s.filter),
            Some(ActionFilter::Only(ChangeAction::Deleted))
        );
        assert_eq!(
            registry.get(&SubscriptionId::new("s1").unwrap()).map(|s| s.id.as_str()),
            Some("s1")
        );
        assert!(registry.get(&SubscriptionId::new("s3").unwrap()).is_none());
    }

    #[test]
    fn matching_preserves_registration_order() {
        let mut registry = SubscriptionRegistry::new();
        registry
            .insert(subscription("s1", ActionFilter::Only(ChangeAction::Changed)))
            .unwrap();
        registry.insert(subscription("s2", ActionFilter::Any)).unwrap();
        registry
            .insert(subscription("s3", ActionFilter::Only(ChangeAction::Added)))
            .unwrap();

        let ids: Vec<_> = registry.matching("changed").map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["s1", "s2"]);

        let ids: Vec<_> = registry.matching("story_added").map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["s2"]);
    }

    #[test]
    fn default_id_includes_every_part() {
        let instance = ConnectorInstanceId::from_uuid(uuid::Uuid::nil());
        let id = default_subscription_id(
            "/asana-connector/webhook",
            &ResourceGid::new("1201").unwrap(),
            ActionFilter::Any,
            instance,
        );
        assert_eq!(
            id.as_str(),
            "Asana/asana-connector/webhook/1201/*/00000000-0000-0000-0000-000000000000"
        );
    }
}
