//! Text header parsing. Reads `H <key>:<value>\n` lines directly off
//! the same [`ByteStream`] cursor the dispatcher will continue reading
//! frames from, so header parsing and frame parsing share one cursor with
//! no re-slicing step in between.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::Result;
use crate::schema::FrameDef;
use crate::stream::ByteStream;
use crate::sysconfig::{CellVoltage, CurrentMeter, FirmwareType, SysConfig};

/// Bound on a single header line: up to the next newline, capped so a
/// malformed or endless line can't run away.
const MAX_HEADER_LINE: usize = 1024;

fn gyro_data_rename_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^gyroData(\d)$").unwrap())
}

fn inav_revision_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^INAV.*\s\d+\.\d+\.\d+").unwrap())
}

fn betaflight_revision_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^.*flight.*\s\d+\.\d+(\.\d+)?").unwrap())
}

/// Converts the hex-encoded IEEE-754 `gyro.scale` value to its firmware's
/// native unit, deg/s-per-microsecond scaled to rad/µs for Cleanflight-class
/// firmwares.
fn convert_gyro_scale(raw: f32, firmware: FirmwareType) -> f32 {
    match firmware {
        FirmwareType::Cleanflight | FirmwareType::Betaflight | FirmwareType::Inav => {
            raw * (std::f32::consts::PI / 180.0 * 1e-6)
        }
        _ => raw,
    }
}

fn parse_i32_list(value: &str) -> Option<Vec<i32>> {
    value
        .split(',')
        .map(|s| s.trim().parse::<i32>().ok())
        .collect()
}

pub struct HeaderParser;

impl HeaderParser {
    /// Consumes header lines from `stream` until a non-`H` marker is seen
    /// (which is pushed back for the dispatcher). Returns the populated,
    /// finalized `SysConfig`/`FrameDefs`, or a tier-2 error if the I or
    /// P frame definitions are missing or malformed.
    pub fn parse(
        stream: &mut ByteStream,
    ) -> Result<(SysConfig, crate::schema::FrameDefs)> {
        let mut sys_config = SysConfig::new();
        let mut defs = crate::schema::FrameDefs::default();

        loop {
            let marker = match stream.read_char() {
                Some(b) => b,
                None => break,
            };
            if marker != b'H' {
                stream.unread_char();
                break;
            }
            // Single space separator between the marker and the key:value text.
            if stream.peek() == Some(b' ') {
                stream.read_char();
            }

            let mut line = Vec::with_capacity(64);
            while line.len() < MAX_HEADER_LINE {
                match stream.read_char() {
                    Some(b'\n') | None => break,
                    Some(b) => line.push(b),
                }
            }
            let line = String::from_utf8_lossy(&line).into_owned();

            Self::dispatch_line(&line, &mut sys_config, &mut defs);
        }

        defs.finalize()?;
        Ok((sys_config, defs))
    }

    fn dispatch_line(
        line: &str,
        sys_config: &mut SysConfig,
        defs: &mut crate::schema::FrameDefs,
    ) {
        let Some((key, value)) = line.split_once(':') else {
            sys_config.unknown_headers.push(line.to_string());
            return;
        };
        let key = key.trim();
        let value = value.trim();

        if let Some(rest) = key.strip_prefix("Field ") {
            if let Some((frame_type, attr)) = rest.split_once(' ') {
                let def = match frame_type {
                    "I" => &mut defs.i,
                    "P" => &mut defs.p,
                    "G" => &mut defs.g,
                    "H" => &mut defs.h,
                    "S" => &mut defs.s,
                    _ => {
                        sys_config.unknown_headers.push(line.to_string());
                        return;
                    }
                };
                Self::apply_field_attr(def, attr, value);
                return;
            }
        }

        match key {
            "I interval" => {
                sys_config.frame_interval_i = value.parse::<i32>().unwrap_or(1).max(1);
            }
            "P interval" => {
                if let Some((num, denom)) = value.split_once('/') {
                    if let (Ok(num), Ok(denom)) =
                        (num.trim().parse::<i32>(), denom.trim().parse::<i32>())
                    {
                        sys_config.frame_interval_p_num = num;
                        sys_config.frame_interval_p_denom = denom.max(1);
                    }
                }
            }
            "Data version" => {
                sys_config.data_version = value.parse().unwrap_or(2);
            }
            "Firmware type" => {
                sys_config.firmware_type = if value == "Cleanflight" {
                    FirmwareType::Cleanflight
                } else {
                    FirmwareType::Baseflight
                };
            }
            "Firmware revision" => {
                if inav_revision_re().is_match(value) {
                    sys_config.firmware_type = FirmwareType::Inav;
                } else if betaflight_revision_re().is_match(value) {
                    sys_config.firmware_type = FirmwareType::Betaflight;
                }
            }
            "gyro.scale" => {
                if let Ok(bits) = u32::from_str_radix(value.trim_start_matches("0x"), 16) {
                    let raw = f32::from_bits(bits);
                    sys_config.gyro_scale = convert_gyro_scale(raw, sys_config.firmware_type);
                }
            }
            "vbatcellvoltage" => {
                if let Some(values) = parse_i32_list(value) {
                    if values.len() == 3 {
                        sys_config.vbat_cell_voltage = CellVoltage {
                            min: values[0],
                            warn: values[1],
                            max: values[2],
                        };
                    }
                }
            }
            "currentMeter" => {
                if let Some(values) = parse_i32_list(value) {
                    if values.len() == 2 {
                        sys_config.current_meter = CurrentMeter {
                            offset: values[0],
                            scale: values[1],
                        };
                    }
                }
            }
            "minthrottle" => sys_config.minthrottle = value.parse().unwrap_or(0),
            "maxthrottle" => sys_config.maxthrottle = value.parse().unwrap_or(0),
            "vbatref" => sys_config.vbatref = value.parse().unwrap_or(0),
            "vbatscale" => sys_config.vbatscale = value.parse().unwrap_or(0),
            "acc_1G" => sys_config.acc_1g = value.parse().unwrap_or(0),
            "Device UID" => sys_config.device_uid = value.to_string(),
            _ => {
                if let Some(values) = parse_i32_list(value) {
                    sys_config.extra.insert(key.to_string(), values);
                } else if let Ok(single) = value.parse::<i32>() {
                    sys_config.extra.insert(key.to_string(), vec![single]);
                } else {
                    sys_config.unknown_headers.push(line.to_string());
                }
            }
        }
    }

    fn apply_field_attr(def: &mut FrameDef, attr: &str, value: &str) {
        match attr {
            "name" => {
                let names = value
                    .split(',')
                    .map(|s| {
                        let s = s.trim();
                        if let Some(caps) = gyro_data_rename_re().captures(s) {
                            format!("gyroADC{}", &caps[1])
                        } else {
                            s.to_string()
                        }
                    })
                    .collect();
                def.set_names(names);
            }
            "signed" => {
                def.signed = value.split(',').map(|s| s.trim() == "1").collect();
            }
            "predictor" => {
                def.predictors = value
                    .split(',')
                    .filter_map(|s| s.trim().parse().ok())
                    .collect();
            }
            "encoding" => {
                def.encodings = value
                    .split(',')
                    .filter_map(|s| s.trim().parse().ok())
                    .collect();
            }
            _ => {}
        }
    }
}

/// Convenience wrapper exposing a `parse_header(start, end)` surface,
/// used by [`crate::decoder::Decoder`].
pub fn parse_header(data: &[u8], start: usize, end: usize) -> Result<(SysConfig, crate::schema::FrameDefs, usize)> {
    let mut stream = ByteStream::new(data, start, end);
    let (sys_config, defs) = HeaderParser::parse(&mut stream)?;
    Ok((sys_config, defs, stream.position()))
}
