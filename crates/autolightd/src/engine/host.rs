//! Capability interface between the engine and the automation host.
//!
//! The engine never talks to a network or a state store directly. Everything
//! it reads, subscribes to or asks for goes through [`Host`], so the same
//! rules run against the daemon runtime and against test doubles.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use strum::Display;
use strum::IntoStaticStr;

use super::trigger::Trigger;

/// Domain part of an entity id ("light" for "light.kitchen")
pub fn domain_of(entity_id: &str) -> &str {
    entity_id
        .split_once('.')
        .map(|(domain, _)| domain)
        .unwrap_or(entity_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Service {
    TurnOn,
    TurnOff,
}

/// Optional service parameters; unset fields are left out of the call
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActionParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,

    #[serde(rename = "color_temp_kelvin", skip_serializing_if = "Option::is_none")]
    pub kelvin: Option<u32>,

    /// Seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<f64>,
}

/// A service call on one entity
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    pub entity_id: String,
    pub service: Service,
    pub params: ActionParams,
}

impl ActionRequest {
    pub fn turn_on(entity_id: impl Into<String>, params: ActionParams) -> Self {
        Self {
            entity_id: entity_id.into(),
            service: Service::TurnOn,
            params,
        }
    }

    pub fn turn_off(entity_id: impl Into<String>, transition: Option<f64>) -> Self {
        Self {
            entity_id: entity_id.into(),
            service: Service::TurnOff,
            params: ActionParams {
                transition,
                ..Default::default()
            },
        }
    }

    pub fn domain(&self) -> &str {
        domain_of(&self.entity_id)
    }
}

impl fmt::Display for ActionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.entity_id, self.service)?;
        if let Some(brightness) = self.params.brightness {
            write!(f, " brightness={}", brightness)?;
        }
        if let Some(kelvin) = self.params.kelvin {
            write!(f, " kelvin={}", kelvin)?;
        }
        if let Some(transition) = self.params.transition {
            write!(f, " transition={}", transition)?;
        }
        Ok(())
    }
}

/// State-change filter registered with the host.
///
/// A state subscription fires when the entity's state changes and the
/// optional `old`/`new` filters match. An attribute subscription fires when
/// the named attribute changes. With a `duration`, the trigger is only
/// delivered once the matching state has held for that long.
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    pub entity_id: String,
    pub attribute: Option<String>,
    pub old: Option<String>,
    pub new: Option<String>,
    pub duration: Option<Duration>,
    pub trigger: Trigger,
}

impl Subscription {
    pub fn state(entity_id: impl Into<String>, trigger: Trigger) -> Self {
        Self {
            entity_id: entity_id.into(),
            attribute: None,
            old: None,
            new: None,
            duration: None,
            trigger,
        }
    }

    pub fn attribute(
        entity_id: impl Into<String>,
        attribute: impl Into<String>,
        trigger: Trigger,
    ) -> Self {
        Self {
            attribute: Some(attribute.into()),
            ..Self::state(entity_id, trigger)
        }
    }

    pub fn with_old(mut self, old: impl Into<String>) -> Self {
        self.old = Some(old.into());
        self
    }

    pub fn with_new(mut self, new: impl Into<String>) -> Self {
        self.new = Some(new.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("action channel closed")]
    ChannelClosed,
}

pub trait Host {
    /// Current state of an entity, `None` when unknown to the host
    fn state(&self, entity_id: &str) -> Option<String>;

    fn attribute(&self, entity_id: &str, attribute: &str) -> Option<Value>;

    fn exists(&self, entity_id: &str) -> bool;

    fn subscribe(&mut self, subscription: Subscription);

    /// Request a service call. Implementations must not block.
    fn invoke(&mut self, action: ActionRequest) -> Result<(), HostError>;
}
