//! Decoding of fixed-layout HID reports into remote-control channel values.

#[cfg(test)]
pub mod mod_test;

use crate::config::{ChannelConfig, ChannelKindConfig, HatAxisConfig, LoadError};

/// Default input range of an unsigned axis byte
const DEFAULT_IN_RANGE: (i32, i32) = (0, 255);
/// Default input range of a signed axis byte
const DEFAULT_SIGNED_IN_RANGE: (i32, i32) = (-128, 127);
/// Default output range of a remote-control channel
const DEFAULT_OUT_RANGE: (i32, i32) = (0, 65535);

/// Per-axis components of the 16 hat switch states, indexed directly by the
/// 4-bit hat code. States follow the standard gamepad convention: 0 = North,
/// 1 = Northeast, 2 = East and so on; 8-15 mean the hat is released.
const HAT_X: [i32; 16] = [0, 1, 1, 1, 0, -1, -1, -1, 0, 0, 0, 0, 0, 0, 0, 0];
const HAT_Y: [i32; 16] = [-1, -1, 0, 1, 1, 1, 0, -1, 0, 0, 0, 0, 0, 0, 0, 0];

/// Clamps incoming values to an input range and scales them linearly to an
/// output range, so the lower bound of the input range maps to the lower
/// bound of the output range and the upper bound maps to the upper bound.
/// Ranges are inclusive from both ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaler {
    in_low: f64,
    in_high: f64,
    out_low: f64,
    out_high: f64,
    scale: f64,
}

impl Scaler {
    /// Creates a new scaler for the given ranges. If `invert` is true, the
    /// output bounds are swapped so the low end of the input maps to the
    /// high end of the output.
    pub fn new(in_range: (i32, i32), out_range: (i32, i32), invert: bool) -> Self {
        let (in_low, in_high) = (in_range.0 as f64, in_range.1 as f64);
        let (out_low, out_high) = if invert {
            (out_range.1 as f64, out_range.0 as f64)
        } else {
            (out_range.0 as f64, out_range.1 as f64)
        };

        // A degenerate input range scales everything to the lower output bound
        let scale = if in_low != in_high {
            (out_high - out_low) / (in_high - in_low)
        } else {
            0.0
        };

        Self {
            in_low,
            in_high,
            out_low,
            out_high,
            scale,
        }
    }

    /// Maps the given value into the output range
    pub fn scale(&self, value: f64) -> f64 {
        if self.in_low == self.in_high {
            self.out_low
        } else if value < self.in_low {
            self.out_low
        } else if value > self.in_high {
            self.out_high
        } else {
            self.out_low + (value - self.in_low) * self.scale
        }
    }
}

/// Which axis of a hat switch a mapping looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HatAxis {
    X,
    Y,
}

impl From<HatAxisConfig> for HatAxis {
    fn from(axis: HatAxisConfig) -> Self {
        match axis {
            HatAxisConfig::X => Self::X,
            HatAxisConfig::Y => Self::Y,
        }
    }
}

/// How a channel value is determined from the bytes of a HID report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMappingType {
    Axis,
    Button,
    MultiButton,
    Hat,
}

impl From<ChannelKindConfig> for ChannelMappingType {
    fn from(kind: ChannelKindConfig) -> Self {
        match kind {
            ChannelKindConfig::Axis => Self::Axis,
            ChannelKindConfig::Button => Self::Button,
            ChannelKindConfig::MultiButton => Self::MultiButton,
            ChannelKindConfig::Hat => Self::Hat,
        }
    }
}

/// One possible state of a multi-button mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonSpec {
    pub offset: usize,
    pub bit: u8,
    pub value: i32,
}

/// Definition of a single mapping from one or more gamepad axes or buttons
/// to a remote-control channel. Built from a [ChannelConfig] at rule load
/// time; the scaler for axis mappings is precomputed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelDefinition {
    channel: usize,
    mapping: ChannelMappingType,
    offset: usize,
    bit: u8,
    axis: HatAxis,
    buttons: Vec<ButtonSpec>,
    out_range: (i32, i32),
    invert: bool,
    signed: bool,
    scaler: Scaler,
}

/// An ordered list of channel definitions that together populate all
/// channels for one device family
pub type ChannelMap = Vec<ChannelDefinition>;

impl ChannelDefinition {
    /// Index of the channel this definition writes to (0-based)
    pub fn channel(&self) -> usize {
        self.channel
    }

    /// Updates the channel value array from the given HID report
    pub fn update(&self, channels: &mut [i32], report: &[u8]) {
        match self.mapping {
            ChannelMappingType::Axis => {
                // Bit index is ignored, just take the byte at the offset
                let Some(&byte) = report.get(self.offset) else {
                    self.warn_out_of_range(self.offset, report.len());
                    return;
                };
                let value = if self.signed {
                    (byte as i8) as f64
                } else {
                    byte as f64
                };
                let scaled = self.scaler.scale(value).round() as i32;
                self.store(channels, scaled);
            }
            ChannelMappingType::Button => {
                let Some(&byte) = report.get(self.offset) else {
                    self.warn_out_of_range(self.offset, report.len());
                    return;
                };
                let pressed = byte & (1 << self.bit) != 0;
                let value = if pressed != self.invert {
                    self.out_range.1
                } else {
                    self.out_range.0
                };
                self.store(channels, value);
            }
            ChannelMappingType::Hat => {
                let Some(&byte) = report.get(self.offset) else {
                    self.warn_out_of_range(self.offset, report.len());
                    return;
                };
                let state = ((byte >> self.bit) & 0x0F) as usize;
                let component = match self.axis {
                    HatAxis::X => HAT_X[state],
                    HatAxis::Y => HAT_Y[state],
                };
                // A released hat leaves the previous channel value in place
                if component != 0 {
                    let component = if self.invert { -component } else { component };
                    let value = if component > 0 {
                        self.out_range.1
                    } else {
                        self.out_range.0
                    };
                    self.store(channels, value);
                }
            }
            ChannelMappingType::MultiButton => {
                // Invert is intentionally ignored here; the channel keeps
                // its previous value when no button is pressed
                for button in self.buttons.iter() {
                    let Some(&byte) = report.get(button.offset) else {
                        self.warn_out_of_range(button.offset, report.len());
                        continue;
                    };
                    if byte & (1 << button.bit) != 0 {
                        self.store(channels, button.value);
                        break;
                    }
                }
            }
        }
    }

    fn store(&self, channels: &mut [i32], value: i32) {
        let Some(slot) = channels.get_mut(self.channel) else {
            log::warn!(
                "Channel {} is outside the channel array of width {}",
                self.channel,
                channels.len()
            );
            return;
        };
        *slot = value;
    }

    fn warn_out_of_range(&self, offset: usize, report_len: usize) {
        log::warn!(
            "Channel {} references byte {offset} outside the {report_len}-byte report",
            self.channel
        );
    }
}

impl TryFrom<&ChannelConfig> for ChannelDefinition {
    type Error = LoadError;

    fn try_from(config: &ChannelConfig) -> Result<Self, Self::Error> {
        if config.channel < 1 {
            return Err(LoadError::InvalidChannelIndex(config.channel));
        }
        let channel = (config.channel - 1) as usize;

        if config.bit > 7 {
            return Err(LoadError::InvalidBitIndex(config.bit));
        }

        let buttons = config
            .buttons
            .iter()
            .map(|button| {
                if button.bit > 7 {
                    return Err(LoadError::InvalidBitIndex(button.bit));
                }
                Ok(ButtonSpec {
                    offset: button.offset,
                    bit: button.bit,
                    value: button.value,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let in_range = match config.in_range {
            Some([low, high]) => (low, high),
            None if config.signed => DEFAULT_SIGNED_IN_RANGE,
            None => DEFAULT_IN_RANGE,
        };
        let out_range = match config.out_range {
            Some([low, high]) => (low, high),
            None => DEFAULT_OUT_RANGE,
        };

        Ok(Self {
            channel,
            mapping: config.kind.into(),
            offset: config.offset,
            bit: config.bit,
            axis: config.axis.unwrap_or(HatAxisConfig::X).into(),
            buttons,
            out_range,
            invert: config.invert,
            signed: config.signed,
            scaler: Scaler::new(in_range, out_range, config.invert),
        })
    }
}

/// Returns the number of channels needed to hold every channel the given
/// map writes to
pub fn channel_count(map: &ChannelMap) -> usize {
    map.iter()
        .map(|definition| definition.channel() + 1)
        .max()
        .unwrap_or(0)
}
