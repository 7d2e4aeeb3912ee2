//! Reconstructs an absolute field value from a decoded raw delta.

use crate::error::{DecodeError, Result};
use crate::schema::{FrameDefs, Predictor, TIME_INDEX};
use crate::sysconfig::SysConfig;

/// Everything a predictor might need beyond the raw value itself.
pub struct PredictorContext<'a> {
    pub sys_config: &'a SysConfig,
    pub defs: &'a FrameDefs,
    /// The frame currently being decoded (write target), fields already
    /// filled in up to (not including) the field under evaluation.
    pub current: &'a [i32],
    pub previous: Option<&'a [i32]>,
    pub previous2: Option<&'a [i32]>,
    pub gps_home: Option<&'a [i32]>,
    pub main_history_previous: Option<&'a [i32]>,
    pub skipped_frames: i32,
    /// When true every predictor behaves as `None`.
    pub raw: bool,
}

fn at(arr: Option<&[i32]>, i: usize) -> i32 {
    arr.and_then(|a| a.get(i)).copied().unwrap_or(0)
}

/// Applies `predictor` to raw value `v` for field `i`. Returns a schema
/// error if required context (e.g. `motor[0]`, a published GPS home) is
/// missing.
pub fn apply(predictor: Predictor, i: usize, v: i32, ctx: &PredictorContext) -> Result<i32> {
    if ctx.raw {
        return Ok(v);
    }

    Ok(match predictor {
        Predictor::None => v,
        Predictor::Previous => match ctx.previous {
            Some(prev) => v.wrapping_add(prev.get(i).copied().unwrap_or(0)),
            None => v,
        },
        Predictor::StraightLine => {
            let p1 = at(ctx.previous, i);
            let p2 = at(ctx.previous2, i);
            v.wrapping_add(2i32.wrapping_mul(p1)).wrapping_sub(p2)
        }
        Predictor::Average2 => {
            let p1 = at(ctx.previous, i);
            let p2 = at(ctx.previous2, i);
            v.wrapping_add((p1.wrapping_add(p2)) / 2)
        }
        Predictor::MinThrottle => (v as u32 as i32).wrapping_add(ctx.sys_config.minthrottle),
        Predictor::Motor0 => {
            let idx = ctx.defs.motor0_index.ok_or_else(|| {
                DecodeError::Schema("Motor0 predictor used but motor[0] is not defined".into())
            })?;
            v.wrapping_add(ctx.current.get(idx).copied().unwrap_or(0))
        }
        Predictor::Inc => {
            let prev = at(ctx.previous, i);
            prev.wrapping_add(ctx.skipped_frames).wrapping_add(1)
        }
        Predictor::HomeCoord => {
            let idx = ctx.defs.gps_home_lat_index.ok_or_else(|| {
                DecodeError::Schema("HomeCoord predictor used but H frame is not defined".into())
            })?;
            v.wrapping_add(at(ctx.gps_home, idx))
        }
        Predictor::HomeCoordLon => {
            let idx = ctx.defs.gps_home_lon_index.ok_or_else(|| {
                DecodeError::Schema("HomeCoord_1 predictor used but H frame is not defined".into())
            })?;
            v.wrapping_add(at(ctx.gps_home, idx))
        }
        Predictor::Const1500 => v.wrapping_add(1500),
        Predictor::VbatRef => v.wrapping_add(ctx.sys_config.vbatref),
        Predictor::LastMainFrameTime => match ctx.main_history_previous {
            Some(prev) => v.wrapping_add(prev.get(TIME_INDEX).copied().unwrap_or(0)),
            None => v,
        },
    })
}
