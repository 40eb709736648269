//! RIFF `sfbk` reader

use super::types::{
    Bag, Generator, InfoEntry, InstrumentHeader, PresetHeader, SampleHeader, SoundFont,
};
use crate::error::{Error, Result};

/// Four-character chunk identifiers
pub mod chunk_id {
    pub const RIFF: [u8; 4] = *b"RIFF";
    pub const LIST: [u8; 4] = *b"LIST";
    pub const SFBK: [u8; 4] = *b"sfbk";
    pub const INFO: [u8; 4] = *b"INFO";
    pub const SDTA: [u8; 4] = *b"sdta";
    pub const PDTA: [u8; 4] = *b"pdta";
    pub const IFIL: [u8; 4] = *b"ifil";
    pub const SMPL: [u8; 4] = *b"smpl";
    pub const PHDR: [u8; 4] = *b"phdr";
    pub const PBAG: [u8; 4] = *b"pbag";
    pub const PGEN: [u8; 4] = *b"pgen";
    pub const INST: [u8; 4] = *b"inst";
    pub const IBAG: [u8; 4] = *b"ibag";
    pub const IGEN: [u8; 4] = *b"igen";
    pub const SHDR: [u8; 4] = *b"shdr";
}

/// Record sizes in bytes
pub mod record_size {
    pub const PHDR: usize = 38;
    pub const BAG: usize = 4;
    pub const GEN: usize = 4;
    pub const INST: usize = 22;
    pub const SHDR: usize = 46;
}

/// INFO sub-chunks that are kept, with their display titles
const INFO_TITLES: &[([u8; 4], &str)] = &[
    (*b"INAM", "Bank name:"),
    (*b"irom", "ROM name:"),
    (*b"ICRD", "Date:"),
    (*b"IENG", "Made by:"),
    (*b"IPRD", "Target:"),
    (*b"ICOP", "Copyright:"),
    (*b"ISFT", "Tools:"),
];

/// Cursor over the raw bytes of a SoundFont file
pub struct SfReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SfReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let b = *self.data.get(self.pos).ok_or(Error::UnexpectedEof)?;
        self.pos += 1;
        Ok(b)
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        let lo = self.read_u8()? as u16;
        let hi = self.read_u8()? as u16;
        Ok(lo | (hi << 8))
    }

    pub fn read_i16_le(&mut self) -> Result<i16> {
        Ok(self.read_u16_le()? as i16)
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        let lo = self.read_u16_le()? as u32;
        let hi = self.read_u16_le()? as u32;
        Ok(lo | (hi << 16))
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(Error::UnexpectedEof)?;
        let bytes = self.data.get(self.pos..end).ok_or(Error::UnexpectedEof)?;
        self.pos = end;
        Ok(bytes)
    }

    fn read_id(&mut self) -> Result<[u8; 4]> {
        let b = self.read_bytes(4)?;
        Ok([b[0], b[1], b[2], b[3]])
    }

    fn read_name(&mut self) -> Result<[u8; 20]> {
        let mut name = [0u8; 20];
        name.copy_from_slice(self.read_bytes(20)?);
        Ok(name)
    }

    /// Read a chunk header, returning its id, size and padded end offset
    fn read_chunk_header(&mut self) -> Result<([u8; 4], usize, usize)> {
        let id = self.read_id()?;
        let size = self.read_u32_le()? as usize;
        let end = self.pos + size + (size & 1);
        Ok((id, size, end))
    }

    /// Parse a complete SoundFont 2 bank
    pub fn parse(&mut self) -> Result<SoundFont> {
        let (id, _, file_end) = self.read_chunk_header()?;
        if id != chunk_id::RIFF || self.read_id()? != chunk_id::SFBK {
            return Err(Error::BadStructure("bad SoundFont header".into()));
        }
        let file_end = file_end.min(self.data.len());

        let mut parts = Parts::default();
        while self.pos + 8 <= file_end {
            let (id, _, chunk_end) = self.read_chunk_header()?;
            if id == chunk_id::LIST {
                let list_type = self.read_id()?;
                while self.pos + 8 <= chunk_end.min(file_end) {
                    let (sub_id, sub_size, sub_end) = self.read_chunk_header()?;
                    match list_type {
                        chunk_id::INFO => self.read_info(sub_id, &mut parts)?,
                        chunk_id::SDTA => self.read_sdta(sub_id, sub_size, &mut parts)?,
                        chunk_id::PDTA => self.read_pdta(sub_id, sub_size, &mut parts)?,
                        _ => {}
                    }
                    self.seek(sub_end);
                }
            }
            self.seek(chunk_end);
        }

        parts.finish()
    }

    fn read_info(&mut self, id: [u8; 4], parts: &mut Parts) -> Result<()> {
        if id == chunk_id::IFIL {
            let major = self.read_u16_le()?;
            if major < 2 {
                return Err(Error::UnsupportedVersion { major });
            }
            return Ok(());
        }
        if let Some((_, title)) = INFO_TITLES.iter().find(|(tag, _)| *tag == id) {
            let text = self.read_zstring(256)?;
            tracing::info!("{:<12}{}", title, text);
            parts.info.push(InfoEntry { title: *title, text });
        }
        Ok(())
    }

    fn read_zstring(&mut self, max: usize) -> Result<String> {
        let mut buf = Vec::new();
        while buf.len() < max {
            match self.read_u8()? {
                0 => break,
                b => buf.push(b),
            }
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn read_sdta(&mut self, id: [u8; 4], size: usize, parts: &mut Parts) -> Result<()> {
        if id != chunk_id::SMPL {
            return Ok(());
        }
        if parts.sample_data.is_some() {
            return Err(Error::BadStructure("duplicate smpl chunk".into()));
        }
        let bytes = self.read_bytes(size & !1)?;
        let data = bytes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        parts.sample_data = Some(data);
        Ok(())
    }

    fn read_pdta(&mut self, id: [u8; 4], size: usize, parts: &mut Parts) -> Result<()> {
        match id {
            chunk_id::PHDR => {
                let count = record_count(size, record_size::PHDR, 2, &id, &parts.presets)?;
                let mut presets = Vec::with_capacity(count);
                for _ in 0..count {
                    presets.push(PresetHeader {
                        name: self.read_name()?,
                        program: self.read_u16_le()?,
                        bank: self.read_u16_le()?,
                        bag_index: self.read_u16_le()?,
                        library: self.read_u32_le()?,
                        genre: self.read_u32_le()?,
                        morphology: self.read_u32_le()?,
                    });
                }
                parts.presets = Some(presets);
            }
            chunk_id::PBAG => {
                let count = record_count(size, record_size::BAG, 1, &id, &parts.preset_bags)?;
                parts.preset_bags = Some(self.read_bags(count)?);
            }
            chunk_id::PGEN => {
                let count = record_count(size, record_size::GEN, 1, &id, &parts.preset_generators)?;
                parts.preset_generators = Some(self.read_generators(count)?);
            }
            chunk_id::INST => {
                let count = record_count(size, record_size::INST, 2, &id, &parts.instruments)?;
                let mut instruments = Vec::with_capacity(count);
                for _ in 0..count {
                    instruments.push(InstrumentHeader {
                        name: self.read_name()?,
                        bag_index: self.read_u16_le()?,
                    });
                }
                parts.instruments = Some(instruments);
            }
            chunk_id::IBAG => {
                let count = record_count(size, record_size::BAG, 1, &id, &parts.instrument_bags)?;
                parts.instrument_bags = Some(self.read_bags(count)?);
            }
            chunk_id::IGEN => {
                let count =
                    record_count(size, record_size::GEN, 1, &id, &parts.instrument_generators)?;
                parts.instrument_generators = Some(self.read_generators(count)?);
            }
            chunk_id::SHDR => {
                let count = record_count(size, record_size::SHDR, 2, &id, &parts.samples)?;
                let mut samples = Vec::with_capacity(count);
                for _ in 0..count {
                    samples.push(SampleHeader {
                        name: self.read_name()?,
                        start: self.read_u32_le()?,
                        end: self.read_u32_le()?,
                        loop_start: self.read_u32_le()?,
                        loop_end: self.read_u32_le()?,
                        sample_rate: self.read_u32_le()?,
                        original_key: self.read_u8()?,
                        correction: self.read_u8()? as i8,
                        sample_link: self.read_u16_le()?,
                        sample_type: self.read_u16_le()?,
                    });
                }
                parts.samples = Some(samples);
            }
            _ => {}
        }
        Ok(())
    }

    fn read_bags(&mut self, count: usize) -> Result<Vec<Bag>> {
        (0..count)
            .map(|_| {
                Ok(Bag {
                    gen_index: self.read_u16_le()?,
                    mod_index: self.read_u16_le()?,
                })
            })
            .collect()
    }

    fn read_generators(&mut self, count: usize) -> Result<Vec<Generator>> {
        (0..count)
            .map(|_| {
                Ok(Generator {
                    oper: self.read_u16_le()?,
                    amount: self.read_u16_le()?,
                })
            })
            .collect()
    }
}

fn record_count<T>(
    size: usize,
    record: usize,
    minimum: usize,
    id: &[u8; 4],
    existing: &Option<T>,
) -> Result<usize> {
    let count = size / record;
    let name = String::from_utf8_lossy(id);
    if existing.is_some() {
        return Err(Error::BadStructure(format!("duplicate {} chunk", name)));
    }
    if count * record != size || count < minimum {
        return Err(Error::BadStructure(format!("bad {} chunk size {}", name, size)));
    }
    Ok(count)
}

/// Chunks collected while walking the file
#[derive(Default)]
struct Parts {
    info: Vec<InfoEntry>,
    presets: Option<Vec<PresetHeader>>,
    preset_bags: Option<Vec<Bag>>,
    preset_generators: Option<Vec<Generator>>,
    instruments: Option<Vec<InstrumentHeader>>,
    instrument_bags: Option<Vec<Bag>>,
    instrument_generators: Option<Vec<Generator>>,
    samples: Option<Vec<SampleHeader>>,
    sample_data: Option<Vec<i16>>,
}

impl Parts {
    fn finish(self) -> Result<SoundFont> {
        let missing = || Error::BadStructure("missing required chunk".into());
        let sf = SoundFont {
            info: self.info,
            presets: self.presets.ok_or_else(missing)?,
            preset_bags: self.preset_bags.ok_or_else(missing)?,
            preset_generators: self.preset_generators.ok_or_else(missing)?,
            instruments: self.instruments.ok_or_else(missing)?,
            instrument_bags: self.instrument_bags.ok_or_else(missing)?,
            instrument_generators: self.instrument_generators.ok_or_else(missing)?,
            samples: self.samples.ok_or_else(missing)?,
            sample_data: self.sample_data.ok_or_else(missing)?,
        };
        validate(&sf)?;
        Ok(sf)
    }
}

/// Check that zone indices are monotonic and stay inside their arrays
pub fn validate(sf: &SoundFont) -> Result<()> {
    check_indices(
        "phdr",
        sf.presets.iter().map(|p| p.bag_index),
        sf.preset_bags.len(),
    )?;
    check_indices(
        "pbag",
        sf.preset_bags.iter().map(|b| b.gen_index),
        sf.preset_generators.len() + 1,
    )?;
    check_indices(
        "inst",
        sf.instruments.iter().map(|i| i.bag_index),
        sf.instrument_bags.len(),
    )?;
    check_indices(
        "ibag",
        sf.instrument_bags.iter().map(|b| b.gen_index),
        sf.instrument_generators.len() + 1,
    )
}

fn check_indices(what: &str, indices: impl Iterator<Item = u16>, limit: usize) -> Result<()> {
    let mut prev = 0u16;
    for index in indices {
        if index < prev || index as usize >= limit {
            return Err(Error::BadStructure(format!("bad {} index {}", what, index)));
        }
        prev = index;
    }
    Ok(())
}
