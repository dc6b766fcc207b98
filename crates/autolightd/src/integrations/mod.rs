#[cfg(feature = "integration_ha")]
pub mod ha;
#[cfg(feature = "integration_mqtt")]
pub mod mqtt;
