//! Top-level frame dispatcher: reads markers, invokes the right decoder,
//! validates frame boundaries, and resynchronizes after corruption.
//!
//! Each frame's framing is decided the moment its own parse finishes (size
//! cap, no premature EOF) rather than by inspecting whatever marker happens
//! to follow it, so a stray junk byte after a good frame corrupts only
//! itself.

use log::{debug, trace, warn};

use crate::error::{DecodeError, Result};
use crate::event::{self, Event};
use crate::frame;
use crate::header;
use crate::history::{GpsHomeRing, MainRing, StreamValidator};
use crate::schema::FrameDefs;
use crate::stats::Stats;
use crate::stream::ByteStream;
use crate::sysconfig::SysConfig;

/// Maximum bytes a single well-formed frame may occupy.
const MAX_FRAME_SIZE: usize = 256;

/// One unit of dispatcher output, passed to the caller's frame callback.
#[derive(Debug, Clone)]
pub enum FrameEvent<'a> {
    /// An I or P frame that was framed correctly; `valid` reflects
    /// whether it also passed iteration/time-jump validation.
    MainFrame {
        frame_type: char,
        valid: bool,
        data: &'a [i32],
        start: usize,
        size: usize,
    },
    /// A G, H or S frame; these carry no validation of their own.
    AuxFrame {
        frame_type: char,
        data: &'a [i32],
        start: usize,
        size: usize,
    },
    /// An E frame, decoded to its event payload.
    Event {
        event: Event,
        start: usize,
        size: usize,
    },
    /// A frame that was not bounded correctly (oversized, truncated, or
    /// framed by an unrecognized marker run) and was dropped whole.
    Corrupt {
        frame_type: Option<char>,
        start: usize,
        size: usize,
    },
}

/// Owns all decoder state for one input buffer: the parsed schema, history
/// rings, validator and statistics.
pub struct Decoder<'a> {
    data: &'a [u8],
    sys_config: Option<SysConfig>,
    defs: Option<FrameDefs>,
    main_ring: Option<MainRing>,
    gps_home_ring: Option<GpsHomeRing>,
    validator: StreamValidator,
    stats: Stats,
    last_gps: Vec<i32>,
    last_slow: Vec<i32>,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Decoder {
            data,
            sys_config: None,
            defs: None,
            main_ring: None,
            gps_home_ring: None,
            validator: StreamValidator::new(),
            stats: Stats::new(),
            last_gps: Vec::new(),
            last_slow: Vec::new(),
        }
    }

    pub fn sys_config(&self) -> Option<&SysConfig> {
        self.sys_config.as_ref()
    }

    pub fn frame_defs(&self) -> Option<&FrameDefs> {
        self.defs.as_ref()
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Populates `SysConfig` and `FrameDefs` from the header text in
    /// `[start, end)`. Returns the byte offset just past the header, where
    /// frame data begins.
    pub fn parse_header(&mut self, start: usize, end: usize) -> Result<usize> {
        let (sys_config, defs, next) = header::parse_header(self.data, start, end)?;
        let field_count = defs.i.len();
        let gps_home_field_count = defs.h.len();
        self.main_ring = Some(MainRing::new(field_count));
        self.gps_home_ring = Some(GpsHomeRing::new(gps_home_field_count));
        self.sys_config = Some(sys_config);
        self.defs = Some(defs);
        self.validator.reset();
        Ok(next)
    }

    /// Zeroes history and last-frame markers; preserves `SysConfig`/`FrameDefs`.
    pub fn reset_data_state(&mut self) {
        if let Some(ring) = self.main_ring.as_mut() {
            ring.reset();
        }
        if let Some(ring) = self.gps_home_ring.as_mut() {
            ring.reset();
        }
        self.validator.reset();
        self.last_gps.clear();
        self.last_slow.clear();
    }

    /// Clears `SysConfig` and `FrameDefs` too.
    pub fn reset_all_state(&mut self) {
        self.sys_config = None;
        self.defs = None;
        self.main_ring = None;
        self.gps_home_ring = None;
        self.validator = StreamValidator::new();
        self.stats = Stats::new();
        self.last_gps.clear();
        self.last_slow.clear();
    }

    /// Caller-side override publishing a GPS home snapshot directly,
    /// invalidating it on a length mismatch.
    pub fn set_gps_home_history(&mut self, values: &[i32]) {
        if let Some(ring) = self.gps_home_ring.as_mut() {
            ring.set_external(values);
        }
    }

    fn has_frame_def(&self, marker: u8) -> bool {
        let Some(defs) = self.defs.as_ref() else {
            return false;
        };
        match marker {
            b'I' => !defs.i.is_empty(),
            b'P' => !defs.p.is_empty(),
            b'G' => !defs.g.is_empty(),
            b'H' => !defs.h.is_empty(),
            b'S' => !defs.s.is_empty(),
            b'E' => true,
            _ => false,
        }
    }

    /// Iterates frames in `[start, end)`, invoking `callback` once per
    /// framed or corrupt frame.
    pub fn parse_log_data<F>(&mut self, start: usize, end: usize, mut callback: F) -> Result<()>
    where
        F: FnMut(FrameEvent),
    {
        let defs = self
            .defs
            .clone()
            .ok_or_else(|| DecodeError::Header("parse_header was not called".into()))?;
        let sys_config = self
            .sys_config
            .clone()
            .ok_or_else(|| DecodeError::Header("parse_header was not called".into()))?;

        let mut stream = ByteStream::new(self.data, start, end);

        loop {
            let marker_pos = stream.position();
            let marker = match stream.read_char() {
                Some(m) => m,
                None => break,
            };

            if self.has_frame_def(marker) {
                let frame_type = marker as char;
                trace!("decoding frame type={} start={}", frame_type, marker_pos);
                let result = self.decode_frame_body(frame_type, &mut stream, &defs, &sys_config);
                let size = stream.position() - marker_pos;
                let premature_eof = stream.eof;
                result?;

                // A frame is framed by its own parse completing cleanly
                // (within the size cap, without running off the end of the
                // input) -- not by whatever byte happens to follow it. A
                // single stray byte after a perfectly good frame is its own,
                // separate corruption, handled the next time around this
                // loop.
                if size <= MAX_FRAME_SIZE && !premature_eof {
                    self.complete_frame(frame_type, marker_pos, size, &sys_config, &mut callback);
                } else {
                    warn!(
                        "corrupt frame type={} start={} size={}",
                        frame_type, marker_pos, size
                    );
                    self.stats.record_corrupt(Some(frame_type), size);
                    self.validator.main_stream_is_valid = false;
                    callback(FrameEvent::Corrupt {
                        frame_type: Some(frame_type),
                        start: marker_pos,
                        size,
                    });
                    stream.set_position(marker_pos + 1);
                }
            } else {
                // Unknown marker, or a known letter whose FrameDef is
                // absent (G/H/S not defined): there's nothing to parse, so
                // this single byte is corrupt on its own rather than the
                // start of anything.
                self.stats.record_corrupt(None, 1);
                self.validator.main_stream_is_valid = false;
                callback(FrameEvent::Corrupt {
                    frame_type: None,
                    start: marker_pos,
                    size: 1,
                });
            }
        }

        Ok(())
    }

    fn decode_frame_body(
        &mut self,
        frame_type: char,
        stream: &mut ByteStream,
        defs: &FrameDefs,
        sys_config: &SysConfig,
    ) -> Result<()> {
        match frame_type {
            'I' => {
                let ring = self.main_ring.as_mut().expect("ring allocated after header parse");
                frame::decode_i_frame(stream, defs, sys_config, ring, false)
            }
            'P' => {
                let last_iter = self.validator.last_iter();
                let ring = self.main_ring.as_mut().expect("ring allocated after header parse");
                frame::decode_p_frame(stream, defs, sys_config, ring, last_iter, false)
            }
            'G' => {
                let gps_home = self
                    .gps_home_ring
                    .as_ref()
                    .and_then(|ring| ring.home())
                    .map(|s| s.to_vec());
                self.last_gps =
                    frame::decode_g_frame(stream, defs, sys_config, gps_home.as_deref(), false)?;
                Ok(())
            }
            'H' => {
                let ring = self
                    .gps_home_ring
                    .as_mut()
                    .expect("gps home ring allocated after header parse");
                frame::decode_h_frame(stream, defs, sys_config, ring, false)
            }
            'S' => {
                self.last_slow = frame::decode_s_frame(stream, defs, sys_config, false)?;
                Ok(())
            }
            'E' => {
                // Event decoding has no schema/predictor dependency; any
                // failure here would be a stream bug, not a schema error.
                let _ = event::decode_event(stream);
                Ok(())
            }
            _ => unreachable!("decode_frame_body called for unknown marker"),
        }
    }

    fn complete_frame<F>(
        &mut self,
        frame_type: char,
        start: usize,
        size: usize,
        sys_config: &SysConfig,
        callback: &mut F,
    ) where
        F: FnMut(FrameEvent),
    {
        match frame_type {
            'I' | 'P' => {
                let ring = self
                    .main_ring
                    .as_mut()
                    .expect("ring allocated after header parse");
                let accepted = self.validator.validate(ring.current(), sys_config);
                self.stats.intentionally_absent_iterations =
                    self.validator.intentionally_absent_iterations;
                if accepted {
                    if frame_type == 'I' {
                        ring.advance_after_i();
                    } else {
                        ring.advance_after_p();
                    }
                    self.stats
                        .record_accepted(frame_type, ring.previous().unwrap_or(&[]), size);
                    debug!("accepted {} frame start={} size={}", frame_type, start, size);
                    callback(FrameEvent::MainFrame {
                        frame_type,
                        valid: true,
                        data: ring.previous().unwrap_or(&[]),
                        start,
                        size,
                    });
                } else {
                    self.stats.record_rejected(frame_type, size);
                    debug!("rejected {} frame start={} size={}", frame_type, start, size);
                    callback(FrameEvent::MainFrame {
                        frame_type,
                        valid: false,
                        data: ring.current(),
                        start,
                        size,
                    });
                }
            }
            'G' => {
                self.stats.record_accepted('G', &self.last_gps, size);
                callback(FrameEvent::AuxFrame {
                    frame_type: 'G',
                    data: &self.last_gps,
                    start,
                    size,
                });
            }
            'H' => {
                let ring = self
                    .gps_home_ring
                    .as_mut()
                    .expect("gps home ring allocated after header parse");
                ring.publish();
                let data = ring.home().unwrap_or(&[]);
                self.stats.record_accepted('H', data, size);
                callback(FrameEvent::AuxFrame {
                    frame_type: 'H',
                    data,
                    start,
                    size,
                });
            }
            'S' => {
                self.stats.record_accepted('S', &self.last_slow, size);
                callback(FrameEvent::AuxFrame {
                    frame_type: 'S',
                    data: &self.last_slow,
                    start,
                    size,
                });
            }
            'E' => {
                // Re-decode the event payload for the callback; the frame
                // body was already walked once during dispatch to find its
                // boundary, and event records carry no state worth caching
                // across that second, cheap pass.
                let mut stream = ByteStream::new(self.data, start + 1, start + size);
                let event = event::decode_event(&mut stream).unwrap_or(Event::Other {
                    event_type: 0,
                });
                if let Event::LoggingResume {
                    log_iteration,
                    current_time,
                } = &event
                {
                    self.validator
                        .adopt(*log_iteration as i32, *current_time as i64);
                }
                self.stats.record_accepted('E', &[], size);
                callback(FrameEvent::Event {
                    event,
                    start,
                    size,
                });
            }
            _ => unreachable!("complete_frame only runs for markers has_frame_def accepted"),
        }
    }
}
