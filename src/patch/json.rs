//! JSON serialization types for patch files

use super::header::VelocityLayer;
use super::reader::Patch;
use super::writer::{modes, LfoBytes, SampleRecord};
use serde::Serialize;

/// Top-level JSON structure for a patch file
#[derive(Debug, Clone, Serialize)]
pub struct PatchJson {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub copyright: String,
    pub instrument: String,
    pub waveforms: u16,
    pub velocity_layers: Vec<VelocityLayerJson>,
    pub samples: Vec<SampleJson>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VelocityLayerJson {
    pub velmin: u8,
    pub velmax: u8,
    pub left: u8,
    #[serde(skip_serializing_if = "is_zero")]
    pub right: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct LfoJson {
    pub sweep: u8,
    pub rate: u8,
    pub depth: u8,
}

/// JSON representation of one sample record
#[derive(Debug, Clone, Serialize)]
pub struct SampleJson {
    pub name: String,
    pub bits: u8,
    /// Waveform size in bytes
    pub data_size: u32,
    pub loop_start: u32,
    pub loop_end: u32,
    pub sample_rate: u16,
    /// Frequencies in milli-hertz
    pub low_freq: u32,
    pub high_freq: u32,
    pub root_freq: u32,
    pub modes: Vec<&'static str>,
    pub envelope_rates: [u8; 6],
    pub envelope_offsets: [u8; 6],
    pub mod_envelope_rates: [u8; 6],
    pub mod_envelope_offsets: [u8; 6],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tremolo: Option<LfoJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibrato: Option<LfoJson>,
    pub scale_frequency: u16,
    pub scale_factor: u16,
    pub volume: u16,
    pub pan: u8,
    pub cutoff: u16,
    pub resonance: u16,
    #[serde(skip_serializing_if = "is_zero")]
    pub exclusive_class: u8,
    #[serde(skip_serializing_if = "is_zero")]
    pub chorus: u8,
    #[serde(skip_serializing_if = "is_zero")]
    pub reverb: u8,
}

fn is_zero(v: &u8) -> bool {
    *v == 0
}

impl PatchJson {
    pub fn new(patch: &Patch) -> Self {
        Self {
            copyright: patch.header.copyright.clone(),
            instrument: patch.header.instrument_name.clone(),
            waveforms: patch.header.waveforms,
            velocity_layers: patch.header.layers.iter().map(VelocityLayerJson::from).collect(),
            samples: patch.samples.iter().map(SampleJson::from).collect(),
        }
    }
}

impl From<&VelocityLayer> for VelocityLayerJson {
    fn from(layer: &VelocityLayer) -> Self {
        Self {
            velmin: layer.velmin,
            velmax: layer.velmax,
            left: layer.left,
            right: layer.right,
        }
    }
}

fn lfo_json(lfo: &LfoBytes) -> Option<LfoJson> {
    if lfo.depth == 0 && lfo.rate == 0 {
        return None;
    }
    Some(LfoJson {
        sweep: lfo.sweep,
        rate: lfo.rate,
        depth: lfo.depth,
    })
}

/// Names of the mode bits set in `flags`
pub fn mode_names(flags: u8) -> Vec<&'static str> {
    [
        (modes::BITS16, "16bit"),
        (modes::UNSIGNED, "unsigned"),
        (modes::LOOPING, "looping"),
        (modes::PINGPONG, "pingpong"),
        (modes::REVERSE, "reverse"),
        (modes::SUSTAIN, "sustain"),
        (modes::ENVELOPE, "envelope"),
        (modes::FAST_RELEASE, "fast_release"),
    ]
    .iter()
    .filter(|(bit, _)| flags & bit != 0)
    .map(|(_, name)| *name)
    .collect()
}

impl From<&SampleRecord> for SampleJson {
    fn from(s: &SampleRecord) -> Self {
        Self {
            name: s.name_str(),
            bits: if s.is_16bit() { 16 } else { 8 },
            data_size: s.data_size,
            loop_start: s.loop_start,
            loop_end: s.loop_end,
            sample_rate: s.sample_rate,
            low_freq: s.low_freq,
            high_freq: s.high_freq,
            root_freq: s.root_freq,
            modes: mode_names(s.modes),
            envelope_rates: s.envelope_rates,
            envelope_offsets: s.envelope_offsets,
            mod_envelope_rates: s.mod_envelope_rates,
            mod_envelope_offsets: s.mod_envelope_offsets,
            tremolo: lfo_json(&s.tremolo),
            vibrato: lfo_json(&s.vibrato),
            scale_frequency: s.scale_frequency,
            scale_factor: s.scale_factor,
            volume: s.volume,
            pan: s.pan,
            cutoff: s.cutoff,
            resonance: s.resonance,
            exclusive_class: s.exclusive_class,
            chorus: s.chorus,
            reverb: s.reverb,
        }
    }
}
