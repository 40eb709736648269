//! Patch file reader

use super::header::{PatchHeader, HEADER_SIZE};
use super::writer::{LfoBytes, SampleRecord};
use crate::error::{Error, Result};

/// A parsed patch file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub header: PatchHeader,
    pub samples: Vec<SampleRecord>,
}

/// Patch file reader
pub struct PatchReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PatchReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or_else(|| Error::PatchParse("unexpected end of data".into()))?;
        self.pos += 1;
        Ok(b)
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        let lo = self.read_u8()? as u16;
        let hi = self.read_u8()? as u16;
        Ok(lo | (hi << 8))
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        let lo = self.read_u16_le()? as u32;
        let hi = self.read_u16_le()? as u32;
        Ok(lo | (hi << 16))
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| Error::PatchParse("unexpected end of data".into()))?;
        let bytes = self.data[self.pos..end].to_vec();
        self.pos = end;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.read_bytes(N)?);
        Ok(out)
    }

    fn read_lfo(&mut self) -> Result<LfoBytes> {
        Ok(LfoBytes {
            sweep: self.read_u8()?,
            rate: self.read_u8()?,
            depth: self.read_u8()?,
        })
    }

    /// Parse the header and every sample record up to the end of the data
    pub fn parse(&mut self) -> Result<Patch> {
        let header = PatchHeader::from_bytes(self.data)?;
        self.pos = HEADER_SIZE;
        let mut samples = Vec::new();
        while !self.is_eof() {
            samples.push(self.parse_sample()?);
        }
        Ok(Patch { header, samples })
    }

    pub fn parse_sample(&mut self) -> Result<SampleRecord> {
        let mut s = SampleRecord {
            name: self.read_array()?,
            fractions: self.read_u8()?,
            data_size: self.read_u32_le()?,
            loop_start: self.read_u32_le()?,
            loop_end: self.read_u32_le()?,
            sample_rate: self.read_u16_le()?,
            low_freq: self.read_u32_le()?,
            high_freq: self.read_u32_le()?,
            root_freq: self.read_u32_le()?,
            tune: self.read_u16_le()?,
            balance: self.read_u8()?,
            envelope_rates: self.read_array()?,
            envelope_offsets: self.read_array()?,
            tremolo: self.read_lfo()?,
            vibrato: self.read_lfo()?,
            modes: self.read_u8()?,
            scale_frequency: self.read_u16_le()?,
            scale_factor: self.read_u16_le()?,
            volume: self.read_u16_le()?,
            delay: self.read_u8()?,
            exclusive_class: self.read_u8()?,
            vibrato_delay: self.read_u8()?,
            mod_envelope_rates: self.read_array()?,
            mod_envelope_offsets: self.read_array()?,
            mod_lfo_delay: self.read_u8()?,
            chorus: self.read_u8()?,
            reverb: self.read_u8()?,
            resonance: self.read_u16_le()?,
            cutoff: self.read_u16_le()?,
            mod_env_to_pitch: self.read_u8()?,
            mod_env_to_filter_fc: self.read_u8()?,
            mod_lfo_to_filter_fc: self.read_u8()?,
            keynum_to_mod_env_hold: self.read_u8()?,
            keynum_to_mod_env_decay: self.read_u8()?,
            keynum_to_vol_env_hold: self.read_u8()?,
            keynum_to_vol_env_decay: self.read_u8()?,
            pan: self.read_u8()?,
            lfo_phase_increment: self.read_u16_le()?,
            lfo_depth: self.read_u8()?,
            vendor: self.read_u8()?,
            data: Vec::new(),
        };
        s.data = self.read_bytes(s.data_size as usize)?;
        Ok(s)
    }
}
