use std::collections::HashMap;

use serde_json::Value;

/// Mirrored state of one host entity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityState {
    pub state: Option<String>,
    pub attributes: HashMap<String, Value>,
}

/// A single observation delivered by a state source
#[derive(Debug, Clone, PartialEq)]
pub enum StateUpdate {
    State {
        entity_id: String,
        state: String,
    },
    Attribute {
        entity_id: String,
        attribute: String,
        value: Value,
    },
}

impl StateUpdate {
    pub fn state(entity_id: impl Into<String>, state: impl Into<String>) -> Self {
        StateUpdate::State {
            entity_id: entity_id.into(),
            state: state.into(),
        }
    }

    pub fn attribute(entity_id: impl Into<String>, attribute: impl Into<String>, value: Value) -> Self {
        StateUpdate::Attribute {
            entity_id: entity_id.into(),
            attribute: attribute.into(),
            value,
        }
    }
}

/// An update that actually changed the store
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    State {
        entity_id: String,
        old: Option<String>,
        new: String,
    },
    Attribute {
        entity_id: String,
        attribute: String,
        old: Option<Value>,
        new: Value,
    },
}

impl StateChange {
    pub fn entity_id(&self) -> &str {
        match self {
            StateChange::State { entity_id, .. } | StateChange::Attribute { entity_id, .. } => {
                entity_id
            }
        }
    }
}

/// In-memory mirror of the host's entity registry
#[derive(Debug, Default)]
pub struct StateStore {
    entities: HashMap<String, EntityState>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an update, returning the change if the value differs
    pub fn apply(&mut self, update: StateUpdate) -> Option<StateChange> {
        match update {
            StateUpdate::State { entity_id, state } => {
                let entry = self.entities.entry(entity_id.clone()).or_default();
                if entry.state.as_deref() == Some(state.as_str()) {
                    return None;
                }
                let old = entry.state.replace(state.clone());
                Some(StateChange::State {
                    entity_id,
                    old,
                    new: state,
                })
            }
            StateUpdate::Attribute {
                entity_id,
                attribute,
                value,
            } => {
                let entry = self.entities.entry(entity_id.clone()).or_default();
                if entry.attributes.get(&attribute) == Some(&value) {
                    return None;
                }
                let old = entry.attributes.insert(attribute.clone(), value.clone());
                Some(StateChange::Attribute {
                    entity_id,
                    attribute,
                    old,
                    new: value,
                })
            }
        }
    }

    pub fn state(&self, entity_id: &str) -> Option<&str> {
        self.entities.get(entity_id)?.state.as_deref()
    }

    pub fn attribute(&self, entity_id: &str, attribute: &str) -> Option<&Value> {
        self.entities.get(entity_id)?.attributes.get(attribute)
    }

    pub fn contains(&self, entity_id: &str) -> bool {
        self.entities.contains_key(entity_id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_state_changes() {
        let mut store = StateStore::new();

        assert_eq!(
            store.apply(StateUpdate::state("light.hall", "off")),
            Some(StateChange::State {
                entity_id: "light.hall".to_string(),
                old: None,
                new: "off".to_string(),
            })
        );
        assert_eq!(store.apply(StateUpdate::state("light.hall", "off")), None);
        assert_eq!(
            store.apply(StateUpdate::state("light.hall", "on")),
            Some(StateChange::State {
                entity_id: "light.hall".to_string(),
                old: Some("off".to_string()),
                new: "on".to_string(),
            })
        );
        assert_eq!(store.state("light.hall"), Some("on"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_attribute_changes() {
        let mut store = StateStore::new();
        let change = store.apply(StateUpdate::attribute("sun.sun", "elevation", json!(3.2)));
        assert!(matches!(change, Some(StateChange::Attribute { old: None, .. })));
        assert_eq!(
            store.apply(StateUpdate::attribute("sun.sun", "elevation", json!(3.2))),
            None
        );

        // Attribute-only entities exist but have no state yet
        assert!(store.contains("sun.sun"));
        assert_eq!(store.state("sun.sun"), None);
        assert_eq!(store.attribute("sun.sun", "elevation"), Some(&json!(3.2)));
        assert_eq!(store.attribute("sun.sun", "azimuth"), None);
    }
}
