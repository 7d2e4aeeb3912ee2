//! Per-frame-type field schema.

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, Result};

/// Field encoding ids. Unknown ids on a header line become a schema error
/// at the point they're first *used*, rather than failing header parse
/// eagerly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Encoding {
    SignedVb,
    UnsignedVb,
    Neg14Bit,
    Tag8_8Svb,
    Tag2_3S32,
    Tag8_4S16,
    Null,
}

impl Encoding {
    pub fn from_id(id: i32) -> Result<Self> {
        match id {
            0 => Ok(Encoding::SignedVb),
            1 => Ok(Encoding::UnsignedVb),
            3 => Ok(Encoding::Neg14Bit),
            6 => Ok(Encoding::Tag8_8Svb),
            7 => Ok(Encoding::Tag2_3S32),
            8 => Ok(Encoding::Tag8_4S16),
            9 => Ok(Encoding::Null),
            other => Err(DecodeError::Schema(format!(
                "unrecognized field encoding id {other}"
            ))),
        }
    }
}

/// Predictor ids. `HomeCoordLon` is the disambiguated second
/// `HomeCoord` in a field list, rewritten from id 7 to 256 by `HeaderParser`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Predictor {
    None,
    Previous,
    StraightLine,
    Average2,
    MinThrottle,
    Motor0,
    Inc,
    HomeCoord,
    Const1500,
    VbatRef,
    LastMainFrameTime,
    HomeCoordLon,
}

impl Predictor {
    pub fn from_id(id: i32) -> Result<Self> {
        match id {
            0 => Ok(Predictor::None),
            1 => Ok(Predictor::Previous),
            2 => Ok(Predictor::StraightLine),
            3 => Ok(Predictor::Average2),
            4 => Ok(Predictor::MinThrottle),
            5 => Ok(Predictor::Motor0),
            6 => Ok(Predictor::Inc),
            7 => Ok(Predictor::HomeCoord),
            8 => Ok(Predictor::Const1500),
            9 => Ok(Predictor::VbatRef),
            10 => Ok(Predictor::LastMainFrameTime),
            256 => Ok(Predictor::HomeCoordLon),
            other => Err(DecodeError::Schema(format!(
                "unrecognized predictor id {other}"
            ))),
        }
    }
}

/// Field schema for one frame type: parallel arrays plus a name index.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameDef {
    pub names: Vec<String>,
    pub signed: Vec<bool>,
    pub predictors: Vec<i32>,
    pub encodings: Vec<i32>,
    #[cfg_attr(feature = "serde", serde(skip))]
    name_index: HashMap<String, usize>,
}

impl FrameDef {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_index.get(name).copied()
    }

    pub fn set_names(&mut self, names: Vec<String>) {
        self.name_index = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        self.signed.resize(names.len(), false);
        self.predictors.resize(names.len(), 0);
        self.encodings.resize(names.len(), 0);
        self.names = names;
    }

    /// Rewrite the second of a pair of consecutive `HOME_COORD` (id 7)
    /// predictors to `HOME_COORD_1` (id 256), disambiguating paired
    /// lat/lon G-frame fields.
    pub fn disambiguate_home_coord(&mut self) {
        let mut prev_was_home_coord = false;
        for p in self.predictors.iter_mut() {
            if *p == 7 {
                if prev_was_home_coord {
                    *p = 256;
                    prev_was_home_coord = false;
                } else {
                    prev_was_home_coord = true;
                }
            } else {
                prev_was_home_coord = false;
            }
        }
    }

    /// Validates that every parallel array agrees in length with `names`.
    pub fn validate_lengths(&self, frame_type: char) -> Result<()> {
        let n = self.names.len();
        if self.signed.len() != n || self.predictors.len() != n || self.encodings.len() != n {
            return Err(DecodeError::Header(format!(
                "frame def {frame_type} has mismatched field-array lengths"
            )));
        }
        Ok(())
    }
}

/// All five frame-type schemas, plus cached indices the predictor
/// evaluator needs repeatedly.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameDefs {
    pub i: FrameDef,
    pub p: FrameDef,
    pub g: FrameDef,
    pub h: FrameDef,
    pub s: FrameDef,
    pub motor0_index: Option<usize>,
    pub gps_home_lat_index: Option<usize>,
    pub gps_home_lon_index: Option<usize>,
}

pub const ITER_INDEX: usize = 0;
pub const TIME_INDEX: usize = 1;

impl FrameDefs {
    /// Applies the post-header-parse rules: P inherits I, home-coord
    /// disambiguation in G, and caches the indices predictors need.
    pub fn finalize(&mut self) -> Result<()> {
        if self.i.is_empty() {
            return Err(DecodeError::Header(
                "log is missing required definitions for I frames".into(),
            ));
        }
        self.i.validate_lengths('I')?;

        // P inherits I's count, names, signedness and name map wholesale,
        // even when the header never declares "Field P name" at all (the
        // common case -- loggers rely on inheritance rather than repeating
        // I's field list). Any P-specific predictor/encoding lines that
        // *were* given override by position.
        let mut p_predictors = self.p.predictors.clone();
        let mut p_encodings = self.p.encodings.clone();
        p_predictors.resize(self.i.len(), 0);
        p_encodings.resize(self.i.len(), 0);
        self.p.set_names(self.i.names.clone());
        self.p.signed = self.i.signed.clone();
        self.p.predictors = p_predictors;
        self.p.encodings = p_encodings;
        self.p.validate_lengths('P')?;

        if self.g.is_empty() != self.h.is_empty() {
            return Err(DecodeError::Header(
                "G and H frame definitions must be present together or not at all".into(),
            ));
        }
        if !self.g.is_empty() {
            self.g.disambiguate_home_coord();
            self.g.validate_lengths('G')?;
        }
        if !self.h.is_empty() {
            self.h.validate_lengths('H')?;
        }
        self.s.validate_lengths('S')?;

        self.motor0_index = self.i.index_of("motor[0]");
        self.gps_home_lat_index = self.h.index_of("GPS_home[0]");
        self.gps_home_lon_index = self.h.index_of("GPS_home[1]");

        Ok(())
    }
}
