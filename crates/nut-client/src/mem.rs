use std::collections::HashMap;

use nut_proto::{Error, Result, TrackingId, TrackingResult};

use crate::client_trait::UpsClient;

const NOT_IMPLEMENTED: &str = "operation not supported by the in-memory client";

/// An in-memory stand-in for a real session, backed by a
/// `device -> variable -> values` map. Used by tests and by embedders
/// that want `UpsClient` semantics without a live server.
///
/// Only variable get/set are implemented; enumeration of descriptions,
/// commands, tracking, and session/login operations raise
/// [`Error::NotImplemented`], mirroring the reference stub this is
/// grounded on, which exists purely to avoid standing up a real server
/// in unit tests that only exercise variable plumbing.
#[derive(Debug, Default, Clone)]
pub struct MemUpsClient {
    values: HashMap<String, HashMap<String, Vec<String>>>,
}

impl MemUpsClient {
    pub fn new() -> Self {
        MemUpsClient::default()
    }

    /// Seed a device's variable map directly, bypassing the protocol
    /// layer — the constructor-time equivalent of a driver publishing
    /// readings.
    pub fn seed(&mut self, dev: impl Into<String>, name: impl Into<String>, values: Vec<String>) {
        self.values
            .entry(dev.into())
            .or_default()
            .insert(name.into(), values);
    }
}

impl UpsClient for MemUpsClient {
    fn authenticate(&mut self, _username: &str, _password: &str) -> Result<()> {
        Err(Error::NotImplemented(NOT_IMPLEMENTED))
    }

    fn logout(&mut self) -> Result<()> {
        Err(Error::NotImplemented(NOT_IMPLEMENTED))
    }

    fn device_names(&mut self) -> Result<Vec<String>> {
        Err(Error::NotImplemented(NOT_IMPLEMENTED))
    }

    fn device_description(&mut self, _dev: &str) -> Result<String> {
        Err(Error::NotImplemented(NOT_IMPLEMENTED))
    }

    fn device_variable_names(&mut self, _dev: &str) -> Result<Vec<String>> {
        Err(Error::NotImplemented(NOT_IMPLEMENTED))
    }

    fn device_rw_variable_names(&mut self, _dev: &str) -> Result<Vec<String>> {
        Err(Error::NotImplemented(NOT_IMPLEMENTED))
    }

    fn device_variable_description(&mut self, _dev: &str, _name: &str) -> Result<String> {
        Err(Error::NotImplemented(NOT_IMPLEMENTED))
    }

    fn device_variable_value(&mut self, dev: &str, name: &str) -> Result<Vec<String>> {
        Ok(self
            .values
            .get(dev)
            .and_then(|vars| vars.get(name))
            .cloned()
            .unwrap_or_default())
    }

    fn set_device_variable(&mut self, dev: &str, name: &str, value: &str) -> Result<TrackingId> {
        let entry = self.values.entry(dev.to_string()).or_default();
        match entry.get_mut(name) {
            Some(values) if !values.is_empty() => values[0] = value.to_string(),
            _ => {
                entry.insert(name.to_string(), vec![value.to_string()]);
            }
        }
        Ok(TrackingId::new())
    }

    fn set_device_variable_values(
        &mut self,
        dev: &str,
        name: &str,
        values: &[String],
    ) -> Result<TrackingId> {
        if let Some(vars) = self.values.get_mut(dev) {
            vars.insert(name.to_string(), values.to_vec());
        }
        Ok(TrackingId::new())
    }

    fn device_command_names(&mut self, _dev: &str) -> Result<Vec<String>> {
        Err(Error::NotImplemented(NOT_IMPLEMENTED))
    }

    fn device_command_description(&mut self, _dev: &str, _name: &str) -> Result<String> {
        Err(Error::NotImplemented(NOT_IMPLEMENTED))
    }

    fn execute_device_command(
        &mut self,
        _dev: &str,
        _name: &str,
        _param: Option<&str>,
    ) -> Result<TrackingId> {
        Err(Error::NotImplemented(NOT_IMPLEMENTED))
    }

    fn device_login(&mut self, _dev: &str) -> Result<()> {
        Err(Error::NotImplemented(NOT_IMPLEMENTED))
    }

    fn device_get_num_logins(&mut self, _dev: &str) -> Result<i32> {
        Err(Error::NotImplemented(NOT_IMPLEMENTED))
    }

    fn device_primary(&mut self, _dev: &str) -> Result<()> {
        Err(Error::NotImplemented(NOT_IMPLEMENTED))
    }

    fn device_master(&mut self, _dev: &str) -> Result<()> {
        Err(Error::NotImplemented(NOT_IMPLEMENTED))
    }

    fn device_forced_shutdown(&mut self, _dev: &str) -> Result<()> {
        Err(Error::NotImplemented(NOT_IMPLEMENTED))
    }

    fn list_device_clients(&mut self) -> Result<HashMap<String, Vec<String>>> {
        Err(Error::NotImplemented(NOT_IMPLEMENTED))
    }

    fn device_get_clients(&mut self, _dev: &str) -> Result<Vec<String>> {
        Err(Error::NotImplemented(NOT_IMPLEMENTED))
    }

    fn tracking_result(&mut self, id: &TrackingId) -> Result<TrackingResult> {
        if id.is_empty() {
            return Ok(TrackingResult::Success);
        }
        Err(Error::NotImplemented(NOT_IMPLEMENTED))
    }

    fn is_feature_enabled(&mut self, _feature: &str) -> Result<bool> {
        Err(Error::NotImplemented(NOT_IMPLEMENTED))
    }

    fn set_feature(&mut self, _feature: &str, _status: bool) -> Result<()> {
        Err(Error::NotImplemented(NOT_IMPLEMENTED))
    }
}
