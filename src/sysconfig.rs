//! Header-derived configuration, immutable once
//! `HeaderParser` finishes.

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Firmware family, used to decide whether `gyro.scale` needs unit
/// conversion and which firmware-revision regex applies during an upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FirmwareType {
    #[default]
    Unknown,
    Baseflight,
    Cleanflight,
    Betaflight,
    Inav,
}

/// `(min, warn, max)` cell voltage thresholds from `vbatcellvoltage`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CellVoltage {
    pub min: i32,
    pub warn: i32,
    pub max: i32,
}

/// `(offset, scale)` from `currentMeter`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CurrentMeter {
    pub offset: i32,
    pub scale: i32,
}

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SysConfig {
    pub data_version: i32,
    pub frame_interval_i: i32,
    pub frame_interval_p_num: i32,
    pub frame_interval_p_denom: i32,
    pub firmware_type: FirmwareType,
    pub minthrottle: i32,
    pub maxthrottle: i32,
    pub vbatref: i32,
    pub vbatscale: i32,
    pub vbat_cell_voltage: CellVoltage,
    pub gyro_scale: f32,
    pub acc_1g: i32,
    pub current_meter: CurrentMeter,
    pub device_uid: String,
    /// Named integer/array tuning parameters with no dedicated field above
    /// (`rollPID`, `rates`, `rcRate`, `gyro_lpf`, ...).
    pub extra: HashMap<String, Vec<i32>>,
    /// Header lines whose key wasn't recognized, preserved verbatim.
    pub unknown_headers: Vec<String>,
}

impl SysConfig {
    pub fn new() -> Self {
        SysConfig {
            frame_interval_i: 1,
            frame_interval_p_num: 1,
            frame_interval_p_denom: 1,
            ..Default::default()
        }
    }

    pub fn extra_i32(&self, key: &str) -> Option<i32> {
        self.extra.get(key).and_then(|v| v.first()).copied()
    }
}
