//! GF1 patch header layout
//!
//! The 239-byte header is the classic patch, instrument and layer headers
//! back to back. Reserved areas carry the `SF2EXT` marker and a directory
//! of the velocity layers stored in the file.

use crate::error::{Error, Result};

/// File magic and format id
pub const MAGIC: &[u8; 22] = b"GF1PATCH110\0ID#000002\0";

/// Marker placed in the patch header's reserved area
pub const SF2EXT: &[u8; 7] = b"SF2EXT\0";

/// Size of the combined header in bytes
pub const HEADER_SIZE: usize = 239;

/// Size of one sample record header in bytes
pub const SAMPLE_HEADER_SIZE: usize = 96;

/// Length of the copyright block
pub const COPYRIGHT_LEN: usize = 60;

/// Length of the instrument name field
pub const INSTRUMENT_NAME_LEN: usize = 16;

/// Voices advertised in the header
pub const VOICES: u8 = 14;

/// Master volume advertised in the header
pub const MASTER_VOLUME: u16 = 127;

/// Velocity layers that fit in the header's two reserved blocks
pub const MAX_DIRECTORY_LAYERS: usize = 19;

/// Directory entries that fit in the instrument block
const FIRST_BLOCK_LAYERS: usize = 9;

/// Header field offsets (in bytes)
pub mod offset {
    pub const MAGIC: usize = 0;
    pub const COPYRIGHT: usize = 22;
    pub const INSTRUMENTS: usize = 82;
    pub const VOICES: usize = 83;
    pub const CHANNELS: usize = 84;
    pub const WAVEFORMS: usize = 85;
    pub const MASTER_VOLUME: usize = 87;
    pub const DATA_SIZE: usize = 89;
    pub const SF2EXT: usize = 93;
    pub const INSTRUMENT_NUMBER: usize = 129;
    pub const INSTRUMENT_NAME: usize = 131;
    pub const INSTRUMENT_SIZE: usize = 147;
    pub const LAYERS: usize = 151;
    /// Number of directory entries, then the first block of entries
    pub const VELOCITY_COUNT: usize = 152;
    pub const VELOCITY_FIRST: usize = 153;
    pub const LAYER_DUPLICATE: usize = 192;
    pub const LAYER_NUMBER: usize = 193;
    pub const LAYER_SIZE: usize = 194;
    pub const LAYER_SAMPLES: usize = 198;
    /// Second block of directory entries
    pub const VELOCITY_SECOND: usize = 199;
}

/// One velocity layer as recorded in the header directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VelocityLayer {
    pub velmin: u8,
    pub velmax: u8,
    /// Samples in the left+mono pass
    pub left: u8,
    /// Samples in the right pass
    pub right: u8,
}

/// Logical contents of a patch header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchHeader {
    pub copyright: String,
    pub instrument_name: String,
    /// Samples in the first pass
    pub waveforms: u16,
    pub layers: Vec<VelocityLayer>,
}

impl PatchHeader {
    /// Encode the header, keeping at most [`MAX_DIRECTORY_LAYERS`] directory entries
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut data = [0u8; HEADER_SIZE];
        data[..MAGIC.len()].copy_from_slice(MAGIC);
        write_padded(&mut data, offset::COPYRIGHT, self.copyright.as_bytes(), COPYRIGHT_LEN);
        data[offset::INSTRUMENTS] = 1;
        data[offset::VOICES] = VOICES;
        write_u16(&mut data, offset::WAVEFORMS, self.waveforms);
        write_u16(&mut data, offset::MASTER_VOLUME, MASTER_VOLUME);
        data[offset::SF2EXT..offset::SF2EXT + SF2EXT.len()].copy_from_slice(SF2EXT);
        write_padded(
            &mut data,
            offset::INSTRUMENT_NAME,
            self.instrument_name.as_bytes(),
            INSTRUMENT_NAME_LEN,
        );
        data[offset::LAYERS] = 1;

        let layers = &self.layers[..self.layers.len().min(MAX_DIRECTORY_LAYERS)];
        data[offset::VELOCITY_COUNT] = layers.len() as u8;
        let (first, second) = layers.split_at(layers.len().min(FIRST_BLOCK_LAYERS));
        write_layers(&mut data, offset::VELOCITY_FIRST, first);
        data[offset::LAYER_SAMPLES] = self.waveforms as u8;
        write_layers(&mut data, offset::VELOCITY_SECOND, second);
        data
    }

    /// Decode a header written by [`PatchHeader::to_bytes`]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::PatchParse("file too small for patch header".into()));
        }
        if &data[..MAGIC.len()] != MAGIC {
            return Err(Error::PatchParse("invalid patch magic".into()));
        }
        if &data[offset::SF2EXT..offset::SF2EXT + SF2EXT.len()] != SF2EXT {
            return Err(Error::PatchParse("missing SF2EXT marker".into()));
        }

        let count = (data[offset::VELOCITY_COUNT] as usize).min(MAX_DIRECTORY_LAYERS);
        let layers = (0..count)
            .map(|i| {
                let base = if i < FIRST_BLOCK_LAYERS {
                    offset::VELOCITY_FIRST + 4 * i
                } else {
                    offset::VELOCITY_SECOND + 4 * (i - FIRST_BLOCK_LAYERS)
                };
                VelocityLayer {
                    velmin: data[base],
                    velmax: data[base + 1],
                    left: data[base + 2],
                    right: data[base + 3],
                }
            })
            .collect();

        Ok(Self {
            copyright: read_padded(&data[offset::COPYRIGHT..offset::COPYRIGHT + COPYRIGHT_LEN]),
            instrument_name: read_padded(
                &data[offset::INSTRUMENT_NAME..offset::INSTRUMENT_NAME + INSTRUMENT_NAME_LEN],
            ),
            waveforms: u16::from_le_bytes([data[offset::WAVEFORMS], data[offset::WAVEFORMS + 1]]),
            layers,
        })
    }
}

fn write_u16(data: &mut [u8], offset: usize, value: u16) {
    data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn write_padded(data: &mut [u8], offset: usize, text: &[u8], len: usize) {
    let n = text.len().min(len);
    data[offset..offset + n].copy_from_slice(&text[..n]);
}

fn write_layers(data: &mut [u8], offset: usize, layers: &[VelocityLayer]) {
    for (i, layer) in layers.iter().enumerate() {
        let base = offset + 4 * i;
        data[base..base + 4].copy_from_slice(&[layer.velmin, layer.velmax, layer.left, layer.right]);
    }
}

fn read_padded(field: &[u8]) -> String {
    let len = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..len]).into_owned()
}
