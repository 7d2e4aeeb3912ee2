//! Sub-state-machine for variable-shape event records.

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::stream::ByteStream;

pub const FLIGHT_LOG_EVENT_LOG_END: u8 = 255;

/// One in-flight-adjustment function: its display name plus the factor its
/// decoded value is scaled by before rounding, `scale` for the raw
/// (signed-VB) branch and `scalef` for the float branch. The corpus carries
/// no retrievable per-function scale table (see `DESIGN.md`), so every
/// entry here is a documented `1.0` placeholder rather than a fabricated
/// tuning constant.
#[derive(Clone, Copy)]
struct AdjustmentFunction {
    name: &'static str,
    scale: f64,
    scalef: f64,
}

const UNKNOWN_ADJUSTMENT_FUNCTION: AdjustmentFunction = AdjustmentFunction {
    name: "Unknown",
    scale: 1.0,
    scalef: 1.0,
};

const INFLIGHT_ADJUSTMENT_FUNCTIONS: [AdjustmentFunction; 22] = [
    AdjustmentFunction { name: "None", scale: 1.0, scalef: 1.0 },
    AdjustmentFunction { name: "RC Rate", scale: 1.0, scalef: 1.0 },
    AdjustmentFunction { name: "RC Expo", scale: 1.0, scalef: 1.0 },
    AdjustmentFunction { name: "Throttle Expo", scale: 1.0, scalef: 1.0 },
    AdjustmentFunction { name: "Pitch & Roll Rate", scale: 1.0, scalef: 1.0 },
    AdjustmentFunction { name: "Yaw Rate", scale: 1.0, scalef: 1.0 },
    AdjustmentFunction { name: "Pitch & Roll P", scale: 1.0, scalef: 1.0 },
    AdjustmentFunction { name: "Pitch & Roll I", scale: 1.0, scalef: 1.0 },
    AdjustmentFunction { name: "Pitch & Roll D", scale: 1.0, scalef: 1.0 },
    AdjustmentFunction { name: "Yaw P", scale: 1.0, scalef: 1.0 },
    AdjustmentFunction { name: "Yaw I", scale: 1.0, scalef: 1.0 },
    AdjustmentFunction { name: "Yaw D", scale: 1.0, scalef: 1.0 },
    AdjustmentFunction { name: "Rate Profile", scale: 1.0, scalef: 1.0 },
    AdjustmentFunction { name: "Pitch Rate", scale: 1.0, scalef: 1.0 },
    AdjustmentFunction { name: "Roll Rate", scale: 1.0, scalef: 1.0 },
    AdjustmentFunction { name: "Pitch P", scale: 1.0, scalef: 1.0 },
    AdjustmentFunction { name: "Pitch I", scale: 1.0, scalef: 1.0 },
    AdjustmentFunction { name: "Pitch D", scale: 1.0, scalef: 1.0 },
    AdjustmentFunction { name: "Roll P", scale: 1.0, scalef: 1.0 },
    AdjustmentFunction { name: "Roll I", scale: 1.0, scalef: 1.0 },
    AdjustmentFunction { name: "Roll D", scale: 1.0, scalef: 1.0 },
    AdjustmentFunction { name: "Horizon Strength", scale: 1.0, scalef: 1.0 },
];

/// One decoded event record. Every variant carries exactly the
/// payload its event type defines; `Other` marks any type this decoder
/// doesn't recognize, whose `lastEvent` the dispatcher discards.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Event {
    SyncBeep {
        time: u32,
    },
    FlightMode {
        new_flags: u32,
        last_flags: u32,
    },
    AutotuneCycleStart {
        phase: u8,
        cycle: u8,
        rising: bool,
        p: u8,
        i: u8,
        d: u8,
    },
    AutotuneCycleResult {
        overshot: u8,
        p: u8,
        i: u8,
        d: u8,
    },
    AutotuneTargets {
        current_angle: f32,
        target_angle: i8,
        target_angle_at_peak: i8,
        first_peak_angle: f32,
        second_peak_angle: f32,
    },
    GtuneCycleResult {
        axis: u8,
        gyro_avg: i32,
        new_p: i16,
    },
    InflightAdjustment {
        function: &'static str,
        value: f64,
    },
    TwitchTest {
        stage: u8,
        value: f32,
    },
    LoggingResume {
        log_iteration: u32,
        current_time: u32,
    },
    /// No payload of its own.
    Disarm,
    LogEnd,
    Other {
        event_type: u8,
    },
}

/// Event-type dispatch bytes. `AUTOTUNE_CYCLE_START`/`RESULT`/`TARGETS` and
/// `INFLIGHT_ADJUSTMENT`/`LOGGING_RESUME` each carry two live values because
/// firmware has shipped two numbering generations for the same event; real
/// logs are only ever seen to use one or the other depending on firmware
/// age, so both are accepted. `GTUNE_CYCLE_RESULT` and `TWITCH_TEST` have no
/// confirmed source (see DESIGN.md) — their dispatch bytes below are
/// placeholders, not verified real-firmware values.
const SYNC_BEEP: u8 = 0;
const AUTOTUNE_CYCLE_START: [u8; 2] = [1, 10];
const AUTOTUNE_CYCLE_RESULT: [u8; 2] = [2, 11];
const AUTOTUNE_TARGETS: [u8; 2] = [3, 12];
const INFLIGHT_ADJUSTMENT: [u8; 2] = [4, 13];
const LOGGING_RESUME: [u8; 2] = [5, 14];
const DISARM: u8 = 15;
const FLIGHT_MODE: u8 = 30;
/// Ungrounded placeholders -- see the doc comment above.
const GTUNE_CYCLE_RESULT: u8 = 20;
const TWITCH_TEST: u8 = 21;

/// Reads one event record starting at the type byte. Returns `None`
/// if the stream was already exhausted (no type byte to read).
pub fn decode_event(stream: &mut ByteStream) -> Option<Event> {
    if stream.peek().is_none() {
        return None;
    }
    let event_type = stream.read_u8();

    Some(match event_type {
        SYNC_BEEP => Event::SyncBeep {
            time: stream.read_unsigned_vb(),
        },
        FLIGHT_MODE => Event::FlightMode {
            new_flags: stream.read_unsigned_vb(),
            last_flags: stream.read_unsigned_vb(),
        },
        t if AUTOTUNE_CYCLE_START.contains(&t) => {
            let phase = stream.read_u8();
            let cycle_and_rising = stream.read_u8();
            Event::AutotuneCycleStart {
                phase,
                cycle: cycle_and_rising & 0x7f,
                rising: (cycle_and_rising >> 7) & 1 != 0,
                p: stream.read_u8(),
                i: stream.read_u8(),
                d: stream.read_u8(),
            }
        }
        t if AUTOTUNE_CYCLE_RESULT.contains(&t) => Event::AutotuneCycleResult {
            overshot: stream.read_u8(),
            p: stream.read_u8(),
            i: stream.read_u8(),
            d: stream.read_u8(),
        },
        t if AUTOTUNE_TARGETS.contains(&t) => Event::AutotuneTargets {
            current_angle: stream.read_s16() as f32 / 10.0,
            target_angle: stream.read_s8(),
            target_angle_at_peak: stream.read_s8(),
            first_peak_angle: stream.read_s16() as f32 / 10.0,
            second_peak_angle: stream.read_s16() as f32 / 10.0,
        },
        GTUNE_CYCLE_RESULT => Event::GtuneCycleResult {
            axis: stream.read_u8(),
            gyro_avg: stream.read_signed_vb(),
            new_p: stream.read_s16(),
        },
        t if INFLIGHT_ADJUSTMENT.contains(&t) => {
            let tmp = stream.read_u8();
            let func_index = (tmp & 0x7f) as usize;
            let function = INFLIGHT_ADJUSTMENT_FUNCTIONS
                .get(func_index)
                .copied()
                .unwrap_or(UNKNOWN_ADJUSTMENT_FUNCTION);
            let value = if tmp < 128 {
                stream.read_signed_vb() as f64 * function.scale
            } else {
                f32::from_bits(stream.read_u32()) as f64 * function.scalef
            };
            let rounded = (value * 10000.0).round() / 10000.0;
            Event::InflightAdjustment {
                function: function.name,
                value: rounded,
            }
        }
        TWITCH_TEST => Event::TwitchTest {
            stage: stream.read_u8(),
            value: f32::from_bits(stream.read_u32()),
        },
        t if LOGGING_RESUME.contains(&t) => Event::LoggingResume {
            log_iteration: stream.read_unsigned_vb(),
            current_time: stream.read_unsigned_vb(),
        },
        DISARM => Event::Disarm,
        FLIGHT_LOG_EVENT_LOG_END => {
            let marker = stream.read_string(11);
            if marker == "End of log\0" {
                stream.halt();
                Event::LogEnd
            } else {
                Event::Other { event_type }
            }
        }
        other => Event::Other { event_type: other },
    })
}
