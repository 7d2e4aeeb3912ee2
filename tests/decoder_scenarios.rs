//! End-to-end seed scenarios against hand-assembled byte buffers (no
//! sample `.bbl` files ship with this pack, so every fixture here is
//! built from the wire-format rules directly).

use blackbox_decoder::{DecodeError, Decoder, Event, FrameEvent};

const MAGIC: &str = "H Product:Blackbox flight data recorder by Nicholas Sherlock\n";

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

/// A minimal header defining I (and, by inheritance, P) with two fields:
/// `loopIteration` (predictor as given) and `time` (predictor `None`).
fn minimal_header(loop_iteration_predictor: u8) -> String {
    format!(
        "{MAGIC}H I interval:1\n\
         H Field I name:loopIteration,time\n\
         H Field I signed:0,0\n\
         H Field I predictor:{loop_iteration_predictor},0\n\
         H Field I encoding:1,1\n"
    )
}

#[test]
fn magic_only_buffer_raises_missing_i_frame_def() {
    let bytes = MAGIC.as_bytes().to_vec();
    let mut decoder = Decoder::new(&bytes);
    let err = decoder
        .parse_header(0, bytes.len())
        .expect_err("header with no field defs must fail");
    match err {
        DecodeError::Header(msg) => assert!(msg.contains("I frames"), "{msg}"),
        other => panic!("expected a header error, got {other:?}"),
    }
}

#[test]
fn minimal_i_only_log_decodes_inc_and_uvb_fields() {
    let header = minimal_header(6); // predictor 6 = Inc
    let mut bytes = header.into_bytes();
    let data_start = bytes.len();
    // marker 'I', Inc field raw byte (discarded), UVB time = 1000
    bytes.extend([b'I', 0x00, 0xE8, 0x07]);

    let mut decoder = Decoder::new(&bytes);
    let parsed_data_start = decoder.parse_header(0, bytes.len()).unwrap();
    assert_eq!(parsed_data_start, data_start);

    let mut frames = Vec::new();
    decoder
        .parse_log_data(data_start, bytes.len(), |event| {
            if let FrameEvent::MainFrame {
                frame_type,
                valid,
                data,
                start,
                size,
            } = event
            {
                frames.push((frame_type, valid, data.to_vec(), start, size));
            }
        })
        .unwrap();

    assert_eq!(frames.len(), 1);
    let (frame_type, valid, data, start, size) = &frames[0];
    assert_eq!(*frame_type, 'I');
    assert!(*valid);
    assert_eq!(data, &[1, 1000]);
    assert_eq!(*start, data_start);
    assert_eq!(*size, 4);

    assert_eq!(decoder.stats().frame_type('I').unwrap().valid_count, 1);
}

#[test]
fn stray_byte_after_good_i_frame_does_not_retroactively_corrupt_it() {
    let header = minimal_header(6);
    let mut bytes = header.into_bytes();
    let data_start = bytes.len();
    // a clean I-frame, one stray byte, then a second clean I-frame
    bytes.extend([b'I', 0x00, 0xE8, 0x07]);
    bytes.push(0xFFu8);
    bytes.extend([b'I', 0x00, 0xE8, 0x07]);

    let mut decoder = Decoder::new(&bytes);
    decoder.parse_header(0, bytes.len()).unwrap();

    let mut main_frames = Vec::new();
    let mut events = Vec::new();
    decoder
        .parse_log_data(data_start, bytes.len(), |event| {
            events.push(match event {
                FrameEvent::MainFrame {
                    frame_type, valid, ..
                } => format!("main:{frame_type}:{valid}"),
                FrameEvent::Corrupt { frame_type, size, .. } => {
                    format!("corrupt:{frame_type:?}:{size}")
                }
                _ => "other".to_string(),
            });
            if let FrameEvent::MainFrame {
                frame_type,
                valid,
                data,
                ..
            } = event
            {
                main_frames.push((frame_type, valid, data.to_vec()));
            }
        })
        .unwrap();

    // The first I-frame is framed and accepted on its own; the stray byte
    // is its own one-byte corruption; the second I-frame reframes cleanly
    // right after it, its Inc field built on the first frame's history.
    assert_eq!(
        events,
        vec![
            "main:I:true".to_string(),
            "corrupt:None:1".to_string(),
            "main:I:true".to_string(),
        ]
    );
    assert_eq!(main_frames, vec![
        ('I', true, vec![1, 1000]),
        ('I', true, vec![2, 1000]),
    ]);
    assert_eq!(decoder.stats().total_corrupt_frames, 1);
    assert_eq!(decoder.stats().frame_type('I').unwrap().valid_count, 2);
}

#[test]
fn p_frame_reconstructs_skipped_iterations() {
    // I interval 32, P interval 1/4: loop iterations logged iff k % 4 == 0.
    let header = format!(
        "{MAGIC}H I interval:32\n\
         H P interval:1/4\n\
         H Field I name:loopIteration,time\n\
         H Field I signed:0,0\n\
         H Field I predictor:0,0\n\
         H Field I encoding:1,1\n\
         H Field P predictor:6,0\n\
         H Field P encoding:1,1\n"
    );
    let mut bytes = header.into_bytes();
    let data_start = bytes.len();

    // I-frame: iteration=0 (raw), time=1000
    bytes.push(b'I');
    bytes.extend(encode_unsigned_vb(0));
    bytes.extend(encode_unsigned_vb(1000));

    // P-frame: Inc field (raw byte discarded), time=2000 (raw, predictor None)
    bytes.push(b'P');
    bytes.push(0x00);
    bytes.extend(encode_unsigned_vb(2000));

    let mut decoder = Decoder::new(&bytes);
    decoder.parse_header(0, bytes.len()).unwrap();

    let mut frames = Vec::new();
    decoder
        .parse_log_data(data_start, bytes.len(), |event| {
            if let FrameEvent::MainFrame {
                frame_type, data, ..
            } = event
            {
                frames.push((frame_type, data.to_vec()));
            }
        })
        .unwrap();

    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0], ('I', vec![0, 1000]));
    assert_eq!(frames[1], ('P', vec![4, 2000]));
    assert_eq!(decoder.stats().intentionally_absent_iterations, 3);
    assert_eq!(decoder.stats().total_corrupt_frames, 0);
}

#[test]
fn log_end_sentinel_halts_immediately() {
    let header = minimal_header(6);
    let mut bytes = header.into_bytes();
    let data_start = bytes.len();

    bytes.push(b'E');
    bytes.push(255); // FLIGHT_LOG_EVENT_LOG_END
    bytes.extend_from_slice(b"End of log\0");
    // trailing bytes that must never be parsed
    bytes.extend([b'I', 0x00, 0xE8, 0x07]);

    let mut decoder = Decoder::new(&bytes);
    decoder.parse_header(0, bytes.len()).unwrap();

    let mut saw_log_end = false;
    let mut saw_anything_else = false;
    decoder
        .parse_log_data(data_start, bytes.len(), |event| match event {
            FrameEvent::Event {
                event: Event::LogEnd,
                ..
            } => saw_log_end = true,
            _ => saw_anything_else = true,
        })
        .unwrap();

    assert!(saw_log_end);
    assert!(!saw_anything_else, "no frame should follow LOG_END");
}

#[test]
fn log_end_with_wrong_payload_is_spurious_and_parsing_continues() {
    let header = minimal_header(6);
    let mut bytes = header.into_bytes();
    let data_start = bytes.len();

    bytes.push(b'E');
    bytes.push(255);
    bytes.extend_from_slice(b"not the end");
    bytes.extend([b'I', 0x00, 0xE8, 0x07]);

    let mut decoder = Decoder::new(&bytes);
    decoder.parse_header(0, bytes.len()).unwrap();

    let mut saw_main_frame = false;
    decoder
        .parse_log_data(data_start, bytes.len(), |event| {
            if let FrameEvent::MainFrame { frame_type: 'I', .. } = event {
                saw_main_frame = true;
            }
        })
        .unwrap();

    assert!(saw_main_frame, "parsing must continue past a spurious LOG_END");
}

#[test]
fn home_coord_prediction_decodes_gps_relative_to_published_home() {
    let header = format!(
        "{MAGIC}H I interval:1\n\
         H Field I name:loopIteration,time\n\
         H Field I signed:0,0\n\
         H Field I predictor:6,0\n\
         H Field I encoding:1,1\n\
         H Field H name:GPS_home[0],GPS_home[1]\n\
         H Field H signed:0,0\n\
         H Field H predictor:7,7\n\
         H Field H encoding:0,0\n\
         H Field G name:GPS_coord[0],GPS_coord[1]\n\
         H Field G signed:0,0\n\
         H Field G predictor:7,7\n\
         H Field G encoding:0,0\n"
    );
    let mut bytes = header.into_bytes();
    let data_start = bytes.len();

    bytes.push(b'H');
    bytes.extend(encode_signed_vb(100));
    bytes.extend(encode_signed_vb(200));

    bytes.push(b'G');
    bytes.extend(encode_signed_vb(10));
    bytes.extend(encode_signed_vb(20));

    let mut decoder = Decoder::new(&bytes);
    let defs = {
        decoder.parse_header(0, bytes.len()).unwrap();
        decoder.frame_defs().unwrap().clone()
    };
    // disambiguation only rewrites G's predictor list; H's pair of
    // HOME_COORD predictors is left as-is since both read through a `None`
    // gps_home context during H's own decode anyway.
    assert_eq!(defs.h.predictors, vec![7, 7]);
    assert_eq!(defs.g.predictors, vec![7, 256]);

    let mut aux_frames = Vec::new();
    decoder
        .parse_log_data(data_start, bytes.len(), |event| {
            if let FrameEvent::AuxFrame {
                frame_type, data, ..
            } = event
            {
                aux_frames.push((frame_type, data.to_vec()));
            }
        })
        .unwrap();

    assert_eq!(aux_frames, vec![('H', vec![100, 200]), ('G', vec![110, 220])]);
}

#[test]
fn parse_log_data_is_idempotent_after_reset() {
    let header = minimal_header(6);
    let mut bytes = header.into_bytes();
    let data_start = bytes.len();
    bytes.extend([b'I', 0x00, 0xE8, 0x07]);

    let mut decoder = Decoder::new(&bytes);
    decoder.parse_header(0, bytes.len()).unwrap();

    let run = |decoder: &mut Decoder| {
        let mut frames = Vec::new();
        decoder
            .parse_log_data(data_start, bytes.len(), |event| {
                if let FrameEvent::MainFrame { data, .. } = event {
                    frames.push(data.to_vec());
                }
            })
            .unwrap();
        frames
    };

    let first = run(&mut decoder);
    decoder.reset_data_state();
    let second = run(&mut decoder);
    assert_eq!(first, second);
}
