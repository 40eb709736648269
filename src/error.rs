use crate::convert::SlotKey;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("bad SoundFont structure: {0}")]
    BadStructure(String),

    #[error("this is a SoundFont {major}.x file, only version 2 (.sf2) is understood")]
    UnsupportedVersion { major: u16 },

    #[error("unexpected end of data")]
    UnexpectedEof,

    #[error("no velocity record found for {slot}")]
    NoRecord { slot: SlotKey },

    #[error("unknown velocity range {velmin}-{velmax} for {slot}")]
    UnknownVelocityRange { slot: SlotKey, velmin: u8, velmax: u8 },

    #[error(
        "{slot}: expected {expected} {pass} samples in velocity range {velmin}-{velmax} but found {found}"
    )]
    LayerCountMismatch {
        slot: SlotKey,
        velmin: u8,
        velmax: u8,
        expected: usize,
        found: usize,
        pass: &'static str,
    },

    #[error("no valid layers found for {slot}")]
    NoLayers { slot: SlotKey },

    #[error("sample '{sample}' has negative length")]
    NegativeLength { sample: String },

    #[error("sample '{sample}' points outside the waveform data")]
    SampleOutOfRange { sample: String },

    #[error("patch parse error: {0}")]
    PatchParse(String),

    #[error("invalid velocity override '{0}' (expected bank:program=layer)")]
    InvalidOverride(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
