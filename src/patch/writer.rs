//! Patch serializer

use super::header::PatchHeader;

/// Mode flag bits of a sample record
pub mod modes {
    pub const BITS16: u8 = 1 << 0;
    pub const UNSIGNED: u8 = 1 << 1;
    pub const LOOPING: u8 = 1 << 2;
    pub const PINGPONG: u8 = 1 << 3;
    pub const REVERSE: u8 = 1 << 4;
    pub const SUSTAIN: u8 = 1 << 5;
    pub const ENVELOPE: u8 = 1 << 6;
    pub const FAST_RELEASE: u8 = 1 << 7;
}

/// Sweep, rate and depth bytes of an LFO
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LfoBytes {
    pub sweep: u8,
    pub rate: u8,
    pub depth: u8,
}

/// One sample record: the classic 96-byte header with its reserved area
/// holding the SF2 extension fields, followed by the waveform
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleRecord {
    pub name: [u8; 7],
    pub fractions: u8,
    /// Waveform size in bytes
    pub data_size: u32,
    /// Loop points in bytes
    pub loop_start: u32,
    pub loop_end: u32,
    pub sample_rate: u16,
    /// Frequencies in milli-hertz
    pub low_freq: u32,
    pub high_freq: u32,
    pub root_freq: u32,
    pub tune: u16,
    pub balance: u8,
    pub envelope_rates: [u8; 6],
    pub envelope_offsets: [u8; 6],
    pub tremolo: LfoBytes,
    pub vibrato: LfoBytes,
    pub modes: u8,
    pub scale_frequency: u16,
    pub scale_factor: u16,
    pub volume: u16,
    pub delay: u8,
    pub exclusive_class: u8,
    pub vibrato_delay: u8,
    pub mod_envelope_rates: [u8; 6],
    pub mod_envelope_offsets: [u8; 6],
    pub mod_lfo_delay: u8,
    pub chorus: u8,
    pub reverb: u8,
    pub resonance: u16,
    pub cutoff: u16,
    pub mod_env_to_pitch: u8,
    pub mod_env_to_filter_fc: u8,
    pub mod_lfo_to_filter_fc: u8,
    pub keynum_to_mod_env_hold: u8,
    pub keynum_to_mod_env_decay: u8,
    pub keynum_to_vol_env_hold: u8,
    pub keynum_to_vol_env_decay: u8,
    pub pan: u8,
    pub lfo_phase_increment: u16,
    pub lfo_depth: u8,
    pub vendor: u8,
    pub data: Vec<u8>,
}

impl SampleRecord {
    pub fn is_16bit(&self) -> bool {
        self.modes & modes::BITS16 != 0
    }

    pub fn name_str(&self) -> String {
        let len = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        String::from_utf8_lossy(&self.name[..len]).into_owned()
    }
}

/// Growable buffer holding one patch file
#[derive(Debug, Default)]
pub struct PatchWriter {
    buf: Vec<u8>,
}

impl PatchWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_header(&mut self, header: &PatchHeader) {
        self.write_bytes(&header.to_bytes());
    }

    pub fn write_sample(&mut self, s: &SampleRecord) {
        self.write_bytes(&s.name);
        self.write_u8(s.fractions);
        self.write_u32(s.data_size);
        self.write_u32(s.loop_start);
        self.write_u32(s.loop_end);
        self.write_u16(s.sample_rate);
        self.write_u32(s.low_freq);
        self.write_u32(s.high_freq);
        self.write_u32(s.root_freq);
        self.write_u16(s.tune);
        self.write_u8(s.balance);
        self.write_bytes(&s.envelope_rates);
        self.write_bytes(&s.envelope_offsets);
        self.write_lfo(&s.tremolo);
        self.write_lfo(&s.vibrato);
        self.write_u8(s.modes);
        self.write_u16(s.scale_frequency);
        self.write_u16(s.scale_factor);
        self.write_u16(s.volume);

        // SF2 extension, inside the classic reserved area
        self.write_u8(s.delay);
        self.write_u8(s.exclusive_class);
        self.write_u8(s.vibrato_delay);
        self.write_bytes(&s.mod_envelope_rates);
        self.write_bytes(&s.mod_envelope_offsets);
        self.write_u8(s.mod_lfo_delay);
        self.write_u8(s.chorus);
        self.write_u8(s.reverb);
        self.write_u16(s.resonance);
        self.write_u16(s.cutoff);
        self.write_u8(s.mod_env_to_pitch);
        self.write_u8(s.mod_env_to_filter_fc);
        self.write_u8(s.mod_lfo_to_filter_fc);
        self.write_u8(s.keynum_to_mod_env_hold);
        self.write_u8(s.keynum_to_mod_env_decay);
        self.write_u8(s.keynum_to_vol_env_hold);
        self.write_u8(s.keynum_to_vol_env_decay);
        self.write_u8(s.pan);
        self.write_u16(s.lfo_phase_increment);
        self.write_u8(s.lfo_depth);
        self.write_u8(s.vendor);

        self.write_bytes(&s.data);
    }

    fn write_lfo(&mut self, lfo: &LfoBytes) {
        self.write_u8(lfo.sweep);
        self.write_u8(lfo.rate);
        self.write_u8(lfo.depth);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
