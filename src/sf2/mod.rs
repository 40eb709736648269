//! SoundFont 2 bank loading

pub mod generator;
pub mod reader;
pub mod types;

pub use generator::{oper, LayerGenerators, ResolvedZone, TerminalZone};
pub use reader::SfReader;
pub use types::{
    sample_type, Bag, ChannelRole, Generator, InfoEntry, InstrumentHeader, PresetHeader,
    SampleHeader, SoundFont,
};

use crate::error::Result;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Parse a SoundFont from raw bytes
pub fn parse(data: &[u8]) -> Result<SoundFont> {
    SfReader::new(data).parse()
}

/// Load a SoundFont file, decompressing it first if it is gzipped
pub fn load(path: &Path) -> Result<SoundFont> {
    let mut data = Vec::new();
    File::open(path)?.read_to_end(&mut data)?;

    if data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b {
        let mut decoder = GzDecoder::new(data.as_slice());
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed)?;
        return parse(&decompressed);
    }
    parse(&data)
}
