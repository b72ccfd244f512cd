//! Device records returned by the cloud device directory.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One speaker in the account's device directory.
///
/// `device_id` is the only field the cloud guarantees; everything else is
/// best-effort metadata that may be renamed or reordered between fetches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Globally unique opaque device identifier.
    #[serde(rename = "deviceID")]
    pub device_id: String,
    /// Numeric hardware identifier, when the device is MIoT-registered.
    #[serde(rename = "miotDID", default)]
    pub miot_did: Option<i64>,
    /// User-assigned alias.
    #[serde(default)]
    pub alias: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Hardware model string (e.g. `L05B`).
    #[serde(default)]
    pub hardware: Option<String>,
    /// Capability flags reported by the device.
    #[serde(default)]
    pub capabilities: Option<HashMap<String, serde_json::Value>>,
}
