//! In-memory SoundFont 2 records

/// Sample type flags from the `shdr` record
pub mod sample_type {
    pub const MONO: u16 = 1;
    pub const RIGHT: u16 = 2;
    pub const LEFT: u16 = 4;
    pub const LINKED: u16 = 8;
    pub const ROM: u16 = 0x8000;
}

/// Preset header (`phdr`, 38 bytes on disk)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetHeader {
    pub name: [u8; 20],
    pub program: u16,
    pub bank: u16,
    pub bag_index: u16,
    pub library: u32,
    pub genre: u32,
    pub morphology: u32,
}

/// Zone index record (`pbag`/`ibag`, 4 bytes on disk)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bag {
    pub gen_index: u16,
    pub mod_index: u16,
}

/// One generator assignment (`pgen`/`igen`, 4 bytes on disk)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generator {
    pub oper: u16,
    pub amount: u16,
}

impl Generator {
    pub fn new(oper: u16, amount: i16) -> Self {
        Self {
            oper,
            amount: amount as u16,
        }
    }

    pub fn range(oper: u16, lo: u8, hi: u8) -> Self {
        Self {
            oper,
            amount: u16::from_le_bytes([lo, hi]),
        }
    }

    /// Signed interpretation of the amount
    pub fn value(&self) -> i16 {
        self.amount as i16
    }

    /// Low and high bytes of a range amount
    pub fn lo_hi(&self) -> (u8, u8) {
        let [lo, hi] = self.amount.to_le_bytes();
        (lo, hi)
    }
}

/// Instrument header (`inst`, 22 bytes on disk)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentHeader {
    pub name: [u8; 20],
    pub bag_index: u16,
}

/// Stereo role of a sample once its name has been taken into account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelRole {
    Mono,
    Left,
    Right,
    /// Any type value that is none of the above, kept verbatim
    Other(u16),
}

impl ChannelRole {
    /// Single character used in patch sample names
    pub fn tag(&self) -> u8 {
        match self {
            ChannelRole::Mono => b'M',
            ChannelRole::Left => b'L',
            ChannelRole::Right => b'R',
            ChannelRole::Other(t) => b'0'.wrapping_add(*t as u8),
        }
    }
}

/// Sample header (`shdr`, 46 bytes on disk)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleHeader {
    pub name: [u8; 20],
    pub start: u32,
    pub end: u32,
    pub loop_start: u32,
    pub loop_end: u32,
    pub sample_rate: u32,
    pub original_key: u8,
    pub correction: i8,
    pub sample_link: u16,
    pub sample_type: u16,
}

impl SampleHeader {
    pub fn is_linked(&self) -> bool {
        self.sample_type & sample_type::LINKED != 0
    }

    /// Declared type, overridden by a trailing `L` or `R` in the name
    pub fn effective_type(&self) -> u16 {
        match name_bytes(&self.name).last() {
            Some(b'L') => sample_type::LEFT,
            Some(b'R') => sample_type::RIGHT,
            _ => self.sample_type,
        }
    }

    pub fn is_rom(&self) -> bool {
        self.effective_type() & sample_type::ROM != 0
    }

    pub fn role(&self) -> ChannelRole {
        match self.effective_type() {
            sample_type::MONO => ChannelRole::Mono,
            sample_type::LEFT => ChannelRole::Left,
            sample_type::RIGHT => ChannelRole::Right,
            t => ChannelRole::Other(t),
        }
    }

    pub fn display_name(&self) -> String {
        String::from_utf8_lossy(name_bytes(&self.name)).into_owned()
    }
}

/// Bytes of a fixed name field up to the first NUL
pub fn name_bytes(raw: &[u8; 20]) -> &[u8] {
    let len = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    &raw[..len]
}

/// Build a fixed 20-byte name field from a string, truncating if needed
pub fn fixed_name(name: &str) -> [u8; 20] {
    let mut out = [0u8; 20];
    for (dst, src) in out.iter_mut().zip(name.bytes()) {
        *dst = src;
    }
    out
}

/// One text entry from the `INFO` list, in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoEntry {
    pub title: &'static str,
    pub text: String,
}

/// A fully loaded SoundFont bank
///
/// The preset, instrument and sample arrays include their terminal records
/// (`EOP`, `EOI`, `EOS`) exactly as stored in the file.
#[derive(Debug, Clone, Default)]
pub struct SoundFont {
    pub info: Vec<InfoEntry>,
    pub presets: Vec<PresetHeader>,
    pub preset_bags: Vec<Bag>,
    pub preset_generators: Vec<Generator>,
    pub instruments: Vec<InstrumentHeader>,
    pub instrument_bags: Vec<Bag>,
    pub instrument_generators: Vec<Generator>,
    pub samples: Vec<SampleHeader>,
    pub sample_data: Vec<i16>,
}

impl SoundFont {
    /// Text of the `IENG` entry, if any
    pub fn engineer(&self) -> Option<&str> {
        self.info
            .iter()
            .find(|e| e.title == "Made by:")
            .map(|e| e.text.as_str())
    }

    /// Real presets, without the terminal record
    pub fn real_presets(&self) -> &[PresetHeader] {
        match self.presets.len() {
            0 => &[],
            n => &self.presets[..n - 1],
        }
    }

    /// Generator lists of each zone of preset `index`
    pub fn preset_zones(&self, index: usize) -> Vec<&[Generator]> {
        let (Some(this), Some(next)) = (self.presets.get(index), self.presets.get(index + 1)) else {
            return Vec::new();
        };
        zone_lists(
            &self.preset_bags,
            &self.preset_generators,
            this.bag_index as usize,
            next.bag_index as usize,
        )
    }

    /// Generator lists of each zone of instrument `index`
    pub fn instrument_zones(&self, index: usize) -> Vec<&[Generator]> {
        if index + 1 >= self.instruments.len() {
            return Vec::new();
        }
        zone_lists(
            &self.instrument_bags,
            &self.instrument_generators,
            self.instruments[index].bag_index as usize,
            self.instruments[index + 1].bag_index as usize,
        )
    }
}

fn zone_lists<'a>(
    bags: &[Bag],
    gens: &'a [Generator],
    first: usize,
    last: usize,
) -> Vec<&'a [Generator]> {
    (first..last)
        .filter_map(|i| {
            let from = bags.get(i)?.gen_index as usize;
            let to = bags.get(i + 1)?.gen_index as usize;
            gens.get(from..to)
        })
        .collect()
}
