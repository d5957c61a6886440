pub mod path;


use std::io;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Built-in device rules bundled with the daemon. Loaded into every
/// [RuleSet](crate::rules::RuleSet) created with
/// [with_builtins](crate::rules::RuleSet::with_builtins).
pub const BUILTIN_RULES_JSON: &str =
    include_str!("../../rootfs/usr/share/rcpad/devices/supported_devices.json");

/// Represents all possible errors loading a device rules document
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Could not read: {0}")]
    IoError(#[from] io::Error),
    #[error("Unable to deserialize: {0}")]
    DeserializeError(#[from] serde_json::Error),
    #[error("Unable to deserialize: {0}")]
    DeserializeYamlError(#[from] serde_yaml::Error),
    #[error("Unsupported rules document version: {0}")]
    UnsupportedVersion(u32),
    #[error("Invalid vendor/product id: {0}")]
    InvalidDeviceId(String),
    #[error("Channel indices must be positive, got {0}")]
    InvalidChannelIndex(u32),
    #[error("Bit index must be in the range 0-7, got {0}")]
    InvalidBitIndex(u8),
}

/// A device rules document. Describes which HID devices are supported and
/// how their reports are mapped to remote-control channels.
#[derive(Debug, Deserialize, Serialize, Clone, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct DeviceRulesConfig {
    pub version: u32,
    pub rules: Vec<RuleConfig>,
}

impl DeviceRulesConfig {
    /// Load a [DeviceRulesConfig] from the given JSON string
    pub fn from_json(content: &str) -> Result<DeviceRulesConfig, LoadError> {
        let config: DeviceRulesConfig = serde_json::from_str(content)?;
        Ok(config)
    }

    /// Load a [DeviceRulesConfig] from the given YAML string
    pub fn from_yaml(content: &str) -> Result<DeviceRulesConfig, LoadError> {
        let config: DeviceRulesConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Load a [DeviceRulesConfig] from the given file path. The format is
    /// chosen based on the file extension; anything that is not YAML is
    /// treated as JSON.
    pub fn from_file(path: &Path) -> Result<DeviceRulesConfig, LoadError> {
        let content = std::fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .map(|ext| ext == "yaml" || ext == "yml")
            .unwrap_or(false);
        if is_yaml {
            Self::from_yaml(content.as_str())
        } else {
            Self::from_json(content.as_str())
        }
    }
}

/// A single device rule: which devices it applies to and the channel map
/// to use for them.
#[derive(Debug, Deserialize, Serialize, Clone, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct RuleConfig {
    /// Condition(s) for the rule to apply. The rule applies if any one of
    /// the conditions matches the device.
    #[serde(rename = "match")]
    pub matches: Option<MatchConfig>,
    /// Ordered list of channel mappings applied to every report from a
    /// matched device.
    pub controls: Vec<ChannelConfig>,
}

/// One condition or a list of conditions
#[derive(Debug, Deserialize, Serialize, Clone, JsonSchema)]
#[serde(untagged)]
pub enum MatchConfig {
    Single(ConditionConfig),
    Multiple(Vec<ConditionConfig>),
}

/// A single match condition. A bare string is shorthand for matching the
/// product name.
#[derive(Debug, Deserialize, Serialize, Clone, JsonSchema)]
#[serde(untagged)]
pub enum ConditionConfig {
    Product(String),
    Fields(ConditionFieldsConfig),
}

/// Field-by-field match condition. Every field that is present must match
/// the device for the condition to hold.
#[derive(Debug, Deserialize, Serialize, Clone, Default, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct ConditionFieldsConfig {
    pub vid: Option<DeviceId>,
    pub pid: Option<DeviceId>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
}

/// A USB vendor or product id, either as a plain integer or as a decimal
/// or hexadecimal string literal (e.g. "0x045e").
#[derive(Debug, Deserialize, Serialize, Clone, JsonSchema)]
#[serde(untagged)]
pub enum DeviceId {
    Number(u16),
    Text(String),
}

impl DeviceId {
    /// Returns the id as an integer, parsing string literals as needed.
    pub fn as_u16(&self) -> Result<u16, LoadError> {
        match self {
            Self::Number(id) => Ok(*id),
            Self::Text(text) => {
                let text = text.trim();
                let parsed = match text.strip_prefix("0x").or(text.strip_prefix("0X")) {
                    Some(hex) => u16::from_str_radix(hex, 16),
                    None => text.parse::<u16>(),
                };
                parsed.map_err(|_| LoadError::InvalidDeviceId(text.to_string()))
            }
        }
    }
}

/// How a channel value is determined from the bytes of a HID report
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKindConfig {
    Axis,
    Button,
    MultiButton,
    Hat,
}

/// Which axis of a hat switch a mapping looks at
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum HatAxisConfig {
    X,
    Y,
}

/// One possible state of a multi-button mapping
#[derive(Debug, Deserialize, Serialize, Clone, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct ButtonConfig {
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub bit: u8,
    #[serde(default)]
    pub value: i32,
}

/// Mapping from one or more bytes/bits of a HID report to a single
/// remote-control channel.
#[derive(Debug, Deserialize, Serialize, Clone, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct ChannelConfig {
    /// Index of the channel, 1-based in the document
    pub channel: u32,
    #[serde(rename = "type")]
    pub kind: ChannelKindConfig,
    /// Byte offset in the HID report
    #[serde(default)]
    pub offset: usize,
    /// Bit index in the byte at `offset`; 0 is the LSB. For hat mappings
    /// this points at the least significant bit of the four bits that
    /// encode the hat state.
    #[serde(default)]
    pub bit: u8,
    /// Hat axis to look at; only meaningful for hat mappings
    pub axis: Option<HatAxisConfig>,
    /// Possible states of a multi-button mapping, in priority order
    #[serde(default)]
    pub buttons: Vec<ButtonConfig>,
    /// Input range coming from the device, closed from both ends
    pub in_range: Option<[i32; 2]>,
    /// Output range of the channel, closed from both ends
    pub out_range: Option<[i32; 2]>,
    #[serde(default)]
    pub invert: bool,
    /// Whether the input byte is a signed 8-bit value; only meaningful for
    /// axis mappings
    #[serde(default)]
    pub signed: bool,
}
