//! Per-frame-type parse routines that walk a schema and fill an output
//! array.

use crate::error::Result;
use crate::history::{GpsHomeRing, MainRing};
use crate::predictor::{self, PredictorContext};
use crate::schema::{Encoding, FrameDef, Predictor};
use crate::stream::ByteStream;
use crate::sysconfig::SysConfig;

/// Decodes one frame's fields from `stream` into `out` (length `def.len()`),
/// walking encodings and applying predictors field by field. `skipped_frames`
/// is only meaningful for fields using the `Inc` predictor (P-frames); pass 0
/// for any other frame type.
///
/// `current_so_far` exposes the fields already written into `out` earlier
/// in this same call (e.g. for `Motor0`, which reads `current[motor[0]]`
/// from the I def even while decoding a later field of the same frame).
#[allow(clippy::too_many_arguments)]
pub fn decode_fields(
    stream: &mut ByteStream,
    def: &FrameDef,
    out: &mut [i32],
    sys_config: &SysConfig,
    defs: &crate::schema::FrameDefs,
    previous: Option<&[i32]>,
    previous2: Option<&[i32]>,
    gps_home: Option<&[i32]>,
    main_history_previous: Option<&[i32]>,
    skipped_frames: i32,
    raw: bool,
) -> Result<()> {
    let n = def.len();
    let mut i = 0usize;

    while i < n {
        let predictor = Predictor::from_id(def.predictors[i])?;

        // An `Inc`-predicted field still consumes bytes per its declared
        // encoding; the raw value is read and discarded, since the result
        // comes entirely from history and the skipped-frame count. Only the predictor rule, not the byte consumption, is
        // special about `Inc`.
        let encoding = Encoding::from_id(def.encodings[i])?;
        match encoding {
            Encoding::SignedVb => {
                let v = stream.read_signed_vb();
                out[i] = apply_one(
                    predictor, i, v, out, sys_config, defs, previous, previous2, gps_home,
                    main_history_previous, skipped_frames, raw,
                )?;
                i += 1;
            }
            Encoding::UnsignedVb => {
                let v = stream.read_unsigned_vb() as i32;
                out[i] = apply_one(
                    predictor, i, v, out, sys_config, defs, previous, previous2, gps_home,
                    main_history_previous, skipped_frames, raw,
                )?;
                i += 1;
            }
            Encoding::Neg14Bit => {
                let v = stream.read_neg_14bit();
                out[i] = apply_one(
                    predictor, i, v, out, sys_config, defs, previous, previous2, gps_home,
                    main_history_previous, skipped_frames, raw,
                )?;
                i += 1;
            }
            Encoding::Null => {
                out[i] = apply_one(
                    predictor, i, 0, out, sys_config, defs, previous, previous2, gps_home,
                    main_history_previous, skipped_frames, raw,
                )?;
                i += 1;
            }
            Encoding::Tag8_8Svb => {
                let group_len = group_run(def, i, Encoding::Tag8_8Svb, 8);
                let mut raw_values = [0i32; 8];
                stream.read_tag8_8svb(&mut raw_values, group_len);
                for (offset, &v) in raw_values.iter().take(group_len).enumerate() {
                    let idx = i + offset;
                    let p = Predictor::from_id(def.predictors[idx])?;
                    out[idx] = apply_one(
                        p, idx, v, out, sys_config, defs, previous, previous2, gps_home,
                        main_history_previous, skipped_frames, raw,
                    )?;
                }
                i += group_len;
            }
            Encoding::Tag2_3S32 => {
                let mut raw_values = [0i32; 3];
                stream.read_tag2_3s32(&mut raw_values);
                let group_len = group_len_capped(n, i, 3);
                for (offset, &v) in raw_values.iter().take(group_len).enumerate() {
                    let idx = i + offset;
                    let p = Predictor::from_id(def.predictors[idx])?;
                    out[idx] = apply_one(
                        p, idx, v, out, sys_config, defs, previous, previous2, gps_home,
                        main_history_previous, skipped_frames, raw,
                    )?;
                }
                i += group_len;
            }
            Encoding::Tag8_4S16 => {
                let mut raw_values = [0i32; 4];
                if sys_config.data_version < 2 {
                    stream.read_tag8_4s16_v1(&mut raw_values);
                } else {
                    stream.read_tag8_4s16_v2(&mut raw_values);
                }
                let group_len = group_len_capped(n, i, 4);
                for (offset, &v) in raw_values.iter().take(group_len).enumerate() {
                    let idx = i + offset;
                    let p = Predictor::from_id(def.predictors[idx])?;
                    out[idx] = apply_one(
                        p, idx, v, out, sys_config, defs, previous, previous2, gps_home,
                        main_history_previous, skipped_frames, raw,
                    )?;
                }
                i += group_len;
            }
        }
    }

    Ok(())
}

fn group_len_capped(total: usize, start: usize, width: usize) -> usize {
    width.min(total - start)
}

/// Scans forward from `start` for the run of consecutive fields sharing
/// `encoding`, capped at `max`.
fn group_run(def: &FrameDef, start: usize, encoding: Encoding, max: usize) -> usize {
    let mut len = 0;
    while len < max && start + len < def.len() {
        match Encoding::from_id(def.encodings[start + len]) {
            Ok(e) if e == encoding => len += 1,
            _ => break,
        }
    }
    len.max(1)
}

#[allow(clippy::too_many_arguments)]
fn apply_one(
    predictor: Predictor,
    i: usize,
    v: i32,
    current: &[i32],
    sys_config: &SysConfig,
    defs: &crate::schema::FrameDefs,
    previous: Option<&[i32]>,
    previous2: Option<&[i32]>,
    gps_home: Option<&[i32]>,
    main_history_previous: Option<&[i32]>,
    skipped_frames: i32,
    raw: bool,
) -> Result<i32> {
    let ctx = PredictorContext {
        sys_config,
        defs,
        current,
        previous,
        previous2,
        gps_home,
        main_history_previous,
        skipped_frames,
        raw,
    };
    predictor::apply(predictor, i, v, &ctx)
}

/// Decodes an I-frame into `ring.current_mut()`. No previous2; previous may
/// be absent on the very first I-frame in the log.
pub fn decode_i_frame(
    stream: &mut ByteStream,
    defs: &crate::schema::FrameDefs,
    sys_config: &SysConfig,
    ring: &mut MainRing,
    raw: bool,
) -> Result<()> {
    let previous = ring.previous().map(|s| s.to_vec());
    let mut out = vec![0i32; defs.i.len()];
    decode_fields(
        stream,
        &defs.i,
        &mut out,
        sys_config,
        defs,
        previous.as_deref(),
        None,
        None,
        None,
        0,
        raw,
    )?;
    ring.current_mut().copy_from_slice(&out);
    Ok(())
}

/// Decodes a P-frame, computing `skippedFrames` from the sampling model
/// first and threading it to the `Inc` predictor.
pub fn decode_p_frame(
    stream: &mut ByteStream,
    defs: &crate::schema::FrameDefs,
    sys_config: &SysConfig,
    ring: &mut MainRing,
    last_iter: i32,
    raw: bool,
) -> Result<()> {
    let skipped_frames = if last_iter < 0 {
        0
    } else {
        crate::sampling::count_intentionally_skipped_frames(sys_config, last_iter)
    };
    let previous = ring.previous().map(|s| s.to_vec());
    let previous2 = ring.previous2().map(|s| s.to_vec());
    let main_history_previous = previous.clone();
    let mut out = vec![0i32; defs.p.len()];
    decode_fields(
        stream,
        &defs.p,
        &mut out,
        sys_config,
        defs,
        previous.as_deref(),
        previous2.as_deref(),
        None,
        main_history_previous.as_deref(),
        skipped_frames,
        raw,
    )?;
    ring.current_mut().copy_from_slice(&out);
    Ok(())
}

/// Decodes a G-frame into `lastGPS`. No prediction history of its own; only
/// `HomeCoord`/`HomeCoordLon` (referencing the home ring) may appear.
pub fn decode_g_frame(
    stream: &mut ByteStream,
    defs: &crate::schema::FrameDefs,
    sys_config: &SysConfig,
    gps_home: Option<&[i32]>,
    raw: bool,
) -> Result<Vec<i32>> {
    let mut out = vec![0i32; defs.g.len()];
    decode_fields(
        stream, &defs.g, &mut out, sys_config, defs, None, None, gps_home, None, 0, raw,
    )?;
    Ok(out)
}

/// Decodes an H-frame into the GPS-home ring's decode target.
pub fn decode_h_frame(
    stream: &mut ByteStream,
    defs: &crate::schema::FrameDefs,
    sys_config: &SysConfig,
    ring: &mut GpsHomeRing,
    raw: bool,
) -> Result<()> {
    let mut out = vec![0i32; defs.h.len()];
    decode_fields(
        stream, &defs.h, &mut out, sys_config, defs, None, None, None, None, 0, raw,
    )?;
    ring.target_mut().copy_from_slice(&out);
    Ok(())
}

/// Decodes an S-frame into `lastSlow`. No prediction history.
pub fn decode_s_frame(
    stream: &mut ByteStream,
    defs: &crate::schema::FrameDefs,
    sys_config: &SysConfig,
    raw: bool,
) -> Result<Vec<i32>> {
    let mut out = vec![0i32; defs.s.len()];
    decode_fields(
        stream, &defs.s, &mut out, sys_config, defs, None, None, None, None, 0, raw,
    )?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FrameDefs;

    fn encode_unsigned_vb(mut v: u32) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let mut b = (v & 0x7f) as u8;
            v >>= 7;
            if v != 0 {
                b |= 0x80;
                out.push(b);
            } else {
                out.push(b);
                break;
            }
        }
        out
    }

    fn encode_signed_vb(v: i32) -> Vec<u8> {
        let zigzag = ((v << 1) ^ (v >> 31)) as u32;
        encode_unsigned_vb(zigzag)
    }

    /// Decoding a frame normally must agree with decoding the same bytes in
    /// raw mode and then applying each field's predictor by hand against the
    /// same history.
    #[test]
    fn raw_mode_round_trips_against_predicted_decode() {
        let mut defs = FrameDefs::default();
        defs.i.set_names(vec!["loopIteration".into(), "value".into()]);
        defs.i.predictors = vec![6, 1]; // Inc, Previous
        defs.i.encodings = vec![1, 0]; // UnsignedVb, SignedVb
        defs.finalize().unwrap();
        let sys_config = SysConfig::new();

        let mut ring = MainRing::new(2);

        // First I-frame establishes history: loopIteration starts at 1
        // (no prior frame), value is written as its literal 100.
        let mut first_bytes = encode_unsigned_vb(0);
        first_bytes.extend(encode_signed_vb(100));
        let mut stream = ByteStream::new(&first_bytes, 0, first_bytes.len());
        decode_i_frame(&mut stream, &defs, &sys_config, &mut ring, false).unwrap();
        ring.advance_after_i();
        assert_eq!(ring.previous(), Some([1, 100].as_slice()));

        // Second I-frame: loopIteration's raw byte is discarded (Inc reads
        // history), value is a delta of 5 off the first frame's 100.
        let mut second_bytes = encode_unsigned_vb(0);
        second_bytes.extend(encode_signed_vb(5));

        let mut predicted_ring = ring.clone();
        let mut stream = ByteStream::new(&second_bytes, 0, second_bytes.len());
        decode_i_frame(&mut stream, &defs, &sys_config, &mut predicted_ring, false).unwrap();
        let predicted = predicted_ring.current().to_vec();
        assert_eq!(predicted, vec![2, 105]);

        // Same bytes, raw mode: every predictor forced to `None`, so the
        // output is literally what was on the wire.
        let mut raw_ring = ring.clone();
        let mut stream = ByteStream::new(&second_bytes, 0, second_bytes.len());
        decode_i_frame(&mut stream, &defs, &sys_config, &mut raw_ring, true).unwrap();
        let raw_values = raw_ring.current().to_vec();
        assert_eq!(raw_values, vec![0, 5]);

        // Applying each field's predictor by hand against the same
        // previous-frame history must reproduce the non-raw decode exactly.
        let previous = ring.previous().unwrap().to_vec();
        let reconstructed: Vec<i32> = raw_values
            .iter()
            .enumerate()
            .map(|(idx, &v)| {
                let ctx = PredictorContext {
                    sys_config: &sys_config,
                    defs: &defs,
                    current: &raw_values,
                    previous: Some(&previous),
                    previous2: None,
                    gps_home: None,
                    main_history_previous: None,
                    skipped_frames: 0,
                    raw: false,
                };
                let predictor = Predictor::from_id(defs.i.predictors[idx]).unwrap();
                predictor::apply(predictor, idx, v, &ctx).unwrap()
            })
            .collect();

        assert_eq!(reconstructed, predicted);
    }
}
