use serde_json::Value;

use super::store::StateChange;
use crate::engine::Subscription;

pub type ListenerId = usize;

/// Attribute values compare against filters by their plain text form
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn filter_matches(filter: &Option<String>, actual: Option<&str>) -> bool {
    match filter {
        Some(expected) => actual == Some(expected.as_str()),
        None => true,
    }
}

/// Registered subscriptions, indexed by registration order
#[derive(Debug, Default)]
pub struct Listeners {
    entries: Vec<Subscription>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, subscription: Subscription) -> ListenerId {
        self.entries.push(subscription);
        self.entries.len() - 1
    }

    pub fn get(&self, id: ListenerId) -> Option<&Subscription> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Listeners whose filters accept `change`
    pub fn matching(&self, change: &StateChange) -> Vec<ListenerId> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, sub)| Self::accepts(sub, change))
            .map(|(id, _)| id)
            .collect()
    }

    /// State listeners with a duration on `entity_id`
    pub fn watching<'a>(&'a self, entity_id: &'a str) -> impl Iterator<Item = ListenerId> + 'a {
        self.entries
            .iter()
            .enumerate()
            .filter(move |(_, sub)| {
                sub.entity_id == entity_id && sub.attribute.is_none() && sub.duration.is_some()
            })
            .map(|(id, _)| id)
    }

    fn accepts(sub: &Subscription, change: &StateChange) -> bool {
        if sub.entity_id != change.entity_id() {
            return false;
        }

        match (change, &sub.attribute) {
            (StateChange::State { old, new, .. }, None) => {
                filter_matches(&sub.old, old.as_deref()) && filter_matches(&sub.new, Some(new.as_str()))
            }
            (
                StateChange::Attribute {
                    attribute, old, new, ..
                },
                Some(wanted),
            ) if attribute == wanted => {
                let old = old.as_ref().map(value_text);
                filter_matches(&sub.old, old.as_deref())
                    && filter_matches(&sub.new, Some(value_text(new).as_str()))
            }
            _ => false,
        }
    }
}
