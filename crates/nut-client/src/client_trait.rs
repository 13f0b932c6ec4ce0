use std::collections::HashMap;

use nut_proto::{CommandInfo, DeviceInfo, Result, TrackingId, TrackingResult, VariableInfo};

/// Common interface shared by every session implementation, whether it
/// talks to a real server ([`crate::tcp::TcpUpsClient`]) or serves values
/// out of memory for tests ([`crate::mem::MemUpsClient`]).
///
/// Required methods map one-to-one onto the underlying protocol
/// primitives; the default methods below are expressed purely in terms
/// of them, so every implementation gets them without re-deriving the
/// lookup logic.
pub trait UpsClient {
    fn authenticate(&mut self, username: &str, password: &str) -> Result<()>;
    fn logout(&mut self) -> Result<()>;

    fn device_names(&mut self) -> Result<Vec<String>>;
    fn device_description(&mut self, dev: &str) -> Result<String>;

    fn device_variable_names(&mut self, dev: &str) -> Result<Vec<String>>;
    fn device_rw_variable_names(&mut self, dev: &str) -> Result<Vec<String>>;
    fn device_variable_description(&mut self, dev: &str, name: &str) -> Result<String>;
    fn device_variable_value(&mut self, dev: &str, name: &str) -> Result<Vec<String>>;
    fn set_device_variable(
        &mut self,
        dev: &str,
        name: &str,
        value: &str,
    ) -> Result<TrackingId>;
    fn set_device_variable_values(
        &mut self,
        dev: &str,
        name: &str,
        values: &[String],
    ) -> Result<TrackingId>;

    fn device_command_names(&mut self, dev: &str) -> Result<Vec<String>>;
    fn device_command_description(&mut self, dev: &str, name: &str) -> Result<String>;
    fn execute_device_command(
        &mut self,
        dev: &str,
        name: &str,
        param: Option<&str>,
    ) -> Result<TrackingId>;

    fn device_login(&mut self, dev: &str) -> Result<()>;
    fn device_get_num_logins(&mut self, dev: &str) -> Result<i32>;
    /// Promote this session to primary monitor for `dev`.
    fn device_primary(&mut self, dev: &str) -> Result<()>;
    /// Deprecated alias of [`UpsClient::device_primary`], kept for
    /// interop with servers that predate the primary/secondary naming.
    fn device_master(&mut self, dev: &str) -> Result<()>;
    fn device_forced_shutdown(&mut self, dev: &str) -> Result<()>;

    fn list_device_clients(&mut self) -> Result<HashMap<String, Vec<String>>>;
    fn device_get_clients(&mut self, dev: &str) -> Result<Vec<String>>;

    fn tracking_result(&mut self, id: &TrackingId) -> Result<TrackingResult>;
    fn is_feature_enabled(&mut self, feature: &str) -> Result<bool>;
    fn set_feature(&mut self, feature: &str, status: bool) -> Result<()>;

    /// Look up one device by name, or `None` if it doesn't exist. Unlike
    /// the required lookups, this never raises for an unknown name.
    fn device(&mut self, name: &str) -> Result<Option<DeviceInfo>> {
        if self.has_device(name)? {
            let description = self.device_description(name)?;
            Ok(Some(DeviceInfo {
                name: name.to_string(),
                description,
            }))
        } else {
            Ok(None)
        }
    }

    fn devices(&mut self) -> Result<Vec<DeviceInfo>> {
        let names = self.device_names()?;
        let mut result = Vec::with_capacity(names.len());
        for name in names {
            let description = self.device_description(&name)?;
            result.push(DeviceInfo { name, description });
        }
        Ok(result)
    }

    fn has_device(&mut self, name: &str) -> Result<bool> {
        Ok(self.device_names()?.iter().any(|n| n == name))
    }

    fn has_device_variable(&mut self, dev: &str, name: &str) -> Result<bool> {
        Ok(self.device_variable_names(dev)?.iter().any(|n| n == name))
    }

    fn has_device_command(&mut self, dev: &str, name: &str) -> Result<bool> {
        Ok(self.device_command_names(dev)?.iter().any(|n| n == name))
    }

    fn has_feature(&mut self, feature: &str) -> Result<bool> {
        Ok(self.is_feature_enabled(feature).is_ok())
    }

    fn device_variable_values(&mut self, dev: &str) -> Result<HashMap<String, Vec<String>>> {
        let mut result = HashMap::new();
        for name in self.device_variable_names(dev)? {
            let value = self.device_variable_value(dev, &name)?;
            result.insert(name, value);
        }
        Ok(result)
    }

    fn device_variables(&mut self, dev: &str) -> Result<Vec<VariableInfo>> {
        let rw: std::collections::HashSet<String> =
            self.device_rw_variable_names(dev)?.into_iter().collect();
        let mut result = Vec::new();
        for name in self.device_variable_names(dev)? {
            let values = self.device_variable_value(dev, &name)?;
            let description = self.device_variable_description(dev, &name).ok();
            result.push(VariableInfo {
                writable: rw.contains(&name),
                name,
                values,
                description,
            });
        }
        Ok(result)
    }

    /// Fetch variables for several devices, tolerating per-device
    /// failures: the overall call only fails if every device failed.
    /// [`crate::tcp::TcpUpsClient`] overrides this with a pipelined
    /// implementation that issues all the `LIST VAR` requests back to
    /// back before reading any reply; this default simply calls
    /// [`UpsClient::device_variable_values`] once per device.
    fn devices_variable_values(
        &mut self,
        devs: &[String],
    ) -> Result<HashMap<String, HashMap<String, Vec<String>>>> {
        let mut result = HashMap::new();
        let mut last_err = None;
        for dev in devs {
            match self.device_variable_values(dev) {
                Ok(vars) => {
                    result.insert(dev.clone(), vars);
                }
                Err(err) => last_err = Some(err),
            }
        }
        if !devs.is_empty() && result.is_empty() {
            if let Some(err) = last_err {
                return Err(err);
            }
        }
        Ok(result)
    }

    fn device_commands(&mut self, dev: &str) -> Result<Vec<CommandInfo>> {
        let mut result = Vec::new();
        for name in self.device_command_names(dev)? {
            let description = self.device_command_description(dev, &name).ok();
            result.push(CommandInfo { name, description });
        }
        Ok(result)
    }
}
