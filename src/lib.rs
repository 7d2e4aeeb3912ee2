//! Decoder core for the Blackbox multicopter flight-data-recorder log
//! format: header parsing, the predictor/encoding schema, and the frame
//! dispatcher that turns a byte buffer into a stream of frame callbacks.
//!
//! ```no_run
//! use blackbox_decoder::Decoder;
//!
//! let bytes = std::fs::read("log.bbl").unwrap();
//! let mut decoder = Decoder::new(&bytes);
//! let data_start = decoder.parse_header(0, bytes.len()).unwrap();
//! decoder
//!     .parse_log_data(data_start, bytes.len(), |event| {
//!         // inspect each frame as it's dispatched
//!         let _ = event;
//!     })
//!     .unwrap();
//! println!("{} bytes decoded", decoder.stats().total_bytes);
//! ```

pub mod decoder;
pub mod error;
pub mod event;
pub mod frame;
pub mod header;
pub mod history;
pub mod predictor;
pub mod sampling;
pub mod schema;
pub mod stats;
pub mod stream;
pub mod sysconfig;

pub use decoder::{Decoder, FrameEvent};
pub use error::DecodeError;
pub use event::Event;
pub use schema::{Encoding, FrameDef, FrameDefs, Predictor};
pub use stats::Stats;
pub use stream::ByteStream;
pub use sysconfig::{FirmwareType, SysConfig};
