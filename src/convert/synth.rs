//! Parameter synthesis: layers the four generator lists of each collected
//! sample and derives the GUS sample record from the result.

use super::envelope::{timecents_to_msec, Envelope, EnvelopeTimes};
use super::options::ConvertOptions;
use super::resolver::Layer;
use super::tables::{bend_coarse, bend_fine, FREQ_TABLE};
use crate::error::{Error, Result};
use crate::patch::{modes, LfoBytes, SampleRecord};
use crate::sf2::{oper, Generator, SampleHeader};

/// Depth scale shared by the vibrato and filter LFOs
pub const VIBRATO_RATE_TUNING: f64 = 38.0;

/// Sample-address units added per coarse offset step
const COARSE_OFFSET_UNIT: i32 = 32768;

/// Bank value the sample-flag heuristic treats as percussion
const DRUM_BANK: u16 = 128;

/// Position of a generator list in the layering order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    GlobalInstrument,
    LocalInstrument,
    GlobalPreset,
    LocalPreset,
}

impl Level {
    /// Preset-level values add to the instrument result instead of replacing it
    pub fn is_preset(&self) -> bool {
        matches!(self, Level::GlobalPreset | Level::LocalPreset)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Level::GlobalInstrument => "global instrument",
            Level::LocalInstrument => "local instrument",
            Level::GlobalPreset => "global preset",
            Level::LocalPreset => "local preset",
        }
    }
}

/// Generator values resolved for one layer
///
/// Times are timecents, levels centibels, pitches cents, as in the bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SfMeta {
    pub mode: i32,
    pub start: i32,
    pub end: i32,
    pub loop_start: i32,
    pub loop_end: i32,
    pub key: i32,
    /// Pitch correction from the sample header
    pub correction: i32,
    pub coarse_tune: i32,
    pub fine_tune: i32,
    pub pan: i32,
    pub keyscale: i32,
    pub keymin: i32,
    pub keymax: i32,
    pub velmin: i32,
    pub velmax: i32,
    pub delay_vol_env: i32,
    pub attack_vol_env: i32,
    pub hold_vol_env: i32,
    pub decay_vol_env: i32,
    pub sustain_vol_env: i32,
    pub release_vol_env: i32,
    pub delay_mod_env: i32,
    pub attack_mod_env: i32,
    pub hold_mod_env: i32,
    pub decay_mod_env: i32,
    pub sustain_mod_env: i32,
    pub release_mod_env: i32,
    pub mod_env_to_pitch: i32,
    pub keynum_to_mod_env_hold: i32,
    pub keynum_to_mod_env_decay: i32,
    pub keynum_to_vol_env_hold: i32,
    pub keynum_to_vol_env_decay: i32,
    pub exclusive_class: i32,
    pub chorus: i32,
    pub reverb: i32,
    pub initial_attenuation: i32,
    pub mod_lfo_to_pitch: i32,
    pub vib_lfo_to_pitch: i32,
    pub mod_lfo_to_volume: i32,
    pub delay_mod_lfo: i32,
    pub freq_mod_lfo: i32,
    pub delay_vib_lfo: i32,
    pub freq_vib_lfo: i32,
    pub velocity: i32,
    pub keynum: i32,
    pub unused5: i32,
    // The filter values keep 16-bit arithmetic
    pub initial_filter_fc: i16,
    pub initial_filter_q: i16,
    pub mod_env_to_filter_fc: i16,
    pub mod_lfo_to_filter_fc: i16,
}

impl SfMeta {
    /// Defaults for a sample before any generator is applied
    pub fn new(sample: &SampleHeader) -> Self {
        Self {
            mode: 0,
            start: sample.start as i32,
            end: sample.end as i32,
            loop_start: sample.loop_start as i32,
            loop_end: sample.loop_end as i32,
            key: sample.original_key as i32,
            correction: sample.correction as i32,
            coarse_tune: 0,
            fine_tune: 0,
            pan: 0,
            keyscale: 100,
            keymin: 0,
            keymax: 127,
            velmin: 0,
            velmax: 127,
            delay_vol_env: -12000,
            attack_vol_env: -12000,
            hold_vol_env: -12000,
            decay_vol_env: -12000,
            sustain_vol_env: 250,
            release_vol_env: -12000,
            delay_mod_env: -12000,
            attack_mod_env: -12000,
            hold_mod_env: -12000,
            decay_mod_env: -12000,
            sustain_mod_env: 0,
            release_mod_env: -12000,
            mod_env_to_pitch: 0,
            keynum_to_mod_env_hold: 0,
            keynum_to_mod_env_decay: 0,
            keynum_to_vol_env_hold: 0,
            keynum_to_vol_env_decay: 0,
            exclusive_class: 0,
            chorus: 0,
            reverb: 0,
            initial_attenuation: 0,
            mod_lfo_to_pitch: 0,
            vib_lfo_to_pitch: 0,
            mod_lfo_to_volume: 0,
            delay_mod_lfo: 0,
            freq_mod_lfo: 0,
            delay_vib_lfo: 0,
            freq_vib_lfo: 0,
            velocity: -1,
            keynum: -1,
            unused5: -1,
            initial_filter_fc: 0,
            initial_filter_q: 0,
            mod_env_to_filter_fc: 0,
            mod_lfo_to_filter_fc: 0,
        }
    }

    /// Resolve a collected layer: global instrument, local instrument,
    /// global preset, then local preset generators
    pub fn resolve(layer: &Layer<'_>) -> Self {
        let mut meta = Self::new(layer.sample);
        let lists = [
            (layer.generators.global_instrument, Level::GlobalInstrument),
            (layer.generators.local_instrument, Level::LocalInstrument),
            (layer.generators.global_preset, Level::GlobalPreset),
            (layer.generators.local_preset, Level::LocalPreset),
        ];
        for (gens, level) in lists {
            meta.apply_all(gens, level);
        }
        meta
    }

    pub fn apply_all(&mut self, gens: &[Generator], level: Level) {
        for g in gens {
            self.apply(g, level);
        }
    }

    /// Apply one generator at `level`
    pub fn apply(&mut self, g: &Generator, level: Level) {
        let value = g.value() as i32;
        let preset = level.is_preset();
        match g.oper {
            oper::START_ADDRS_OFFSET => self.start = self.start.wrapping_add(value),
            oper::END_ADDRS_OFFSET => self.end = self.end.wrapping_add(value),
            oper::STARTLOOP_ADDRS_OFFSET => self.loop_start = self.loop_start.wrapping_add(value),
            oper::ENDLOOP_ADDRS_OFFSET => self.loop_end = self.loop_end.wrapping_add(value),
            oper::START_ADDRS_COARSE_OFFSET => {
                self.start = self.start.wrapping_add(value * COARSE_OFFSET_UNIT)
            }
            oper::END_ADDRS_COARSE_OFFSET => {
                self.end = self.end.wrapping_add(value * COARSE_OFFSET_UNIT)
            }
            oper::STARTLOOP_ADDRS_COARSE_OFFSET => {
                self.loop_start = self.loop_start.wrapping_add(value * COARSE_OFFSET_UNIT)
            }
            oper::ENDLOOP_ADDRS_COARSE_OFFSET => {
                self.loop_end = self.loop_end.wrapping_add(value * COARSE_OFFSET_UNIT)
            }
            oper::KEY_RANGE => {
                let (lo, hi) = g.lo_hi();
                apply_range(&mut self.keymin, &mut self.keymax, lo, hi, preset);
            }
            oper::VEL_RANGE => {
                let (lo, hi) = g.lo_hi();
                apply_range(&mut self.velmin, &mut self.velmax, lo, hi, preset);
            }
            oper::SAMPLE_MODES => self.mode = g.amount as i32,
            oper::OVERRIDING_ROOT_KEY => {
                if (0..=127).contains(&value) {
                    self.key = value;
                }
            }
            oper::EXCLUSIVE_CLASS => self.exclusive_class = value,
            oper::VELOCITY => self.velocity = value,
            oper::KEYNUM => self.keynum = value,
            oper::UNUSED5 => {
                self.unused5 = value;
                tracing::debug!("vendor parameter {}", value);
            }
            oper::INSTRUMENT | oper::SAMPLE_ID => {}
            oper::INITIAL_FILTER_FC
            | oper::INITIAL_FILTER_Q
            | oper::MOD_ENV_TO_FILTER_FC
            | oper::MOD_LFO_TO_FILTER_FC => {
                let field = match g.oper {
                    oper::INITIAL_FILTER_FC => &mut self.initial_filter_fc,
                    oper::INITIAL_FILTER_Q => &mut self.initial_filter_q,
                    oper::MOD_ENV_TO_FILTER_FC => &mut self.mod_env_to_filter_fc,
                    _ => &mut self.mod_lfo_to_filter_fc,
                };
                *field = if preset {
                    field.wrapping_add(g.value())
                } else {
                    g.value()
                };
            }
            other => match self.layered_field(other) {
                Some(field) if preset => *field = field.wrapping_add(value),
                Some(field) => *field = value,
                None => tracing::warn!(
                    "generator {} with value {} not handled at the {} level",
                    other,
                    value,
                    level.label()
                ),
            },
        }
    }

    /// Fields replaced at instrument level and summed at preset level
    fn layered_field(&mut self, op: u16) -> Option<&mut i32> {
        let field = match op {
            oper::MOD_LFO_TO_PITCH => &mut self.mod_lfo_to_pitch,
            oper::VIB_LFO_TO_PITCH => &mut self.vib_lfo_to_pitch,
            oper::MOD_ENV_TO_PITCH => &mut self.mod_env_to_pitch,
            oper::MOD_LFO_TO_VOLUME => &mut self.mod_lfo_to_volume,
            oper::CHORUS_EFFECTS_SEND => &mut self.chorus,
            oper::REVERB_EFFECTS_SEND => &mut self.reverb,
            oper::PAN => &mut self.pan,
            oper::DELAY_MOD_LFO => &mut self.delay_mod_lfo,
            oper::FREQ_MOD_LFO => &mut self.freq_mod_lfo,
            oper::DELAY_VIB_LFO => &mut self.delay_vib_lfo,
            oper::FREQ_VIB_LFO => &mut self.freq_vib_lfo,
            oper::DELAY_MOD_ENV => &mut self.delay_mod_env,
            oper::ATTACK_MOD_ENV => &mut self.attack_mod_env,
            oper::HOLD_MOD_ENV => &mut self.hold_mod_env,
            oper::DECAY_MOD_ENV => &mut self.decay_mod_env,
            oper::SUSTAIN_MOD_ENV => &mut self.sustain_mod_env,
            oper::RELEASE_MOD_ENV => &mut self.release_mod_env,
            oper::KEYNUM_TO_MOD_ENV_HOLD => &mut self.keynum_to_mod_env_hold,
            oper::KEYNUM_TO_MOD_ENV_DECAY => &mut self.keynum_to_mod_env_decay,
            oper::DELAY_VOL_ENV => &mut self.delay_vol_env,
            oper::ATTACK_VOL_ENV => &mut self.attack_vol_env,
            oper::HOLD_VOL_ENV => &mut self.hold_vol_env,
            oper::DECAY_VOL_ENV => &mut self.decay_vol_env,
            oper::SUSTAIN_VOL_ENV => &mut self.sustain_vol_env,
            oper::RELEASE_VOL_ENV => &mut self.release_vol_env,
            oper::KEYNUM_TO_VOL_ENV_HOLD => &mut self.keynum_to_vol_env_hold,
            oper::KEYNUM_TO_VOL_ENV_DECAY => &mut self.keynum_to_vol_env_decay,
            oper::INITIAL_ATTENUATION => &mut self.initial_attenuation,
            oper::COARSE_TUNE => &mut self.coarse_tune,
            oper::FINE_TUNE => &mut self.fine_tune,
            oper::SCALE_TUNING => &mut self.keyscale,
            _ => return None,
        };
        Some(field)
    }

    /// Total detune in cents: sample correction plus both tuning generators
    pub fn tune(&self) -> i32 {
        self.correction + self.coarse_tune * 100 + self.fine_tune
    }
}

/// An instrument range replaces; a preset range only narrows
fn apply_range(min: &mut i32, max: &mut i32, lo: u8, hi: u8, preset: bool) {
    let (lo, hi) = (lo as i32, hi as i32);
    if !preset || (lo >= *min && hi <= *max) {
        *min = lo;
        *max = hi;
    }
}

/// Absolute cents to hertz
pub fn to_hz(cents: i32) -> i32 {
    (8.176 * 2f64.powf(cents as f64 / 1200.0)) as i32
}

/// Absolute cents to twentieths of a hertz
pub fn to_hz20(cents: i32) -> i32 {
    (20.0 * 8.176 * 2f64.powf(cents as f64 / 1200.0)) as i32
}

fn cents_ratio(cents: i32) -> f64 {
    2f64.powf(cents as f64 / 1200.0)
}

/// Peak volume (0-255) from the initial attenuation in centibels
pub fn peak_volume(attenuation: i32) -> i32 {
    if attenuation == 0 {
        return 255;
    }
    let cb = attenuation.clamp(0, 960) as f64;
    let volume = 255.0 * (1.0 - (cb / 100.0) / (1200.0 * 2f64.log10()));
    if volume < 1.0 {
        0
    } else {
        volume.min(255.0) as i32
    }
}

fn centibels_to_volume(cb: i32) -> i32 {
    (255.0 * 10f64.powf(-(cb as f64) / 200.0)).clamp(0.0, 255.0) as i32
}

/// Sustain level of the volume envelope
///
/// Levels below 100 are treated as bogus and replaced with 250.
pub fn sustain_level(cb: i32) -> i32 {
    if cb == 0 {
        return 250;
    }
    match centibels_to_volume(cb) {
        level if level < 100 => 250,
        level => level.min(253),
    }
}

/// Keep the sustain offset two steps under the peak
///
/// A peak below 2 leaves a negative offset, stored as its low byte.
pub fn sustain_below_peak(sustain: i32, volume: i32) -> i32 {
    sustain.min(volume - 2)
}

/// Sustain level of the modulation envelope
pub fn mod_sustain_level(cb: i32) -> i32 {
    if cb == 0 {
        250
    } else {
        centibels_to_volume(cb)
    }
}

/// Root frequency in milli-hertz and the pitch-center note
pub fn root_pitch(meta: &SfMeta) -> (u32, u16) {
    let mut root = meta.key;
    let mut tune = meta.tune();

    if root >= meta.keymax + 60 {
        root -= 60;
    }
    // Fold whole semitones so that tune ends up in (-100, 0]
    if tune <= -100 {
        let steps = -tune / 100;
        root += steps;
        tune += steps * 100;
    }
    if tune > 0 {
        let steps = (tune + 99) / 100;
        root -= steps;
        tune -= steps * 100;
    }

    let center = if root > 0 { root } else { 60 };
    let fine = bend_fine((-tune * 256 / 100) as usize);
    let freq = if root > 127 {
        FREQ_TABLE[127] as f64 * bend_coarse((root - 127) as usize) * fine
    } else if root < 0 {
        FREQ_TABLE[0] as f64 / bend_coarse((-root) as usize) * fine
    } else {
        FREQ_TABLE[root as usize] as f64 * fine
    };
    (freq as u32, center as u16)
}

fn key_freq(key: i32) -> u32 {
    FREQ_TABLE[key.clamp(0, 127) as usize]
}

/// LFO rate byte from a frequency in absolute cents; zero means the 8 Hz default
fn lfo_rate(freq: i32) -> i32 {
    let hz = if freq == 0 { 8 } else { to_hz(freq) };
    (hz.max(1) * 20).min(255)
}

/// Tremolo from the modulation LFO's volume depth
pub fn tremolo(meta: &SfMeta) -> LfoBytes {
    if meta.mod_lfo_to_volume == 0 {
        return LfoBytes::default();
    }
    let level = meta.mod_lfo_to_volume.abs() as f64;
    let scaled = (255.0 * (1.0 - level / (1200.0 * 2f64.log10()))).clamp(0.0, 255.0) as i32;
    let depth = (255 - scaled).abs().clamp(2, 20);
    let rate = lfo_rate(meta.freq_mod_lfo);
    LfoBytes {
        sweep: (rate / 5) as u8,
        rate: rate as u8,
        depth: depth as u8,
    }
}

/// Vibrato settings and the delays that go with them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Vibrato {
    pub lfo: LfoBytes,
    /// Vibrato onset in milliseconds
    pub delay: i32,
    /// Modulation LFO onset in milliseconds
    pub mod_lfo_delay: i32,
}

/// Vibrato from the vibrato LFO, or the modulation LFO when it has no pitch depth
pub fn vibrato(meta: &SfMeta) -> Vibrato {
    let msec_or_zero = |tc: i32| if tc != 0 { timecents_to_msec(tc) } else { 0 };
    let mod_lfo_delay = msec_or_zero(meta.delay_mod_lfo);

    let (shift, freq, delay) = if meta.vib_lfo_to_pitch != 0 {
        (
            meta.vib_lfo_to_pitch,
            meta.freq_vib_lfo,
            msec_or_zero(meta.delay_vib_lfo),
        )
    } else if meta.mod_lfo_to_pitch != 0 {
        (meta.mod_lfo_to_pitch, meta.freq_mod_lfo, mod_lfo_delay)
    } else {
        return Vibrato {
            mod_lfo_delay,
            ..Default::default()
        };
    };

    let depth = ((cents_ratio(shift) * VIBRATO_RATE_TUNING) as i32)
        .abs()
        .clamp(2, 20);
    let rate = lfo_rate(freq);
    Vibrato {
        lfo: LfoBytes {
            sweep: (rate / 5) as u8,
            rate: rate as u8,
            depth: depth as u8,
        },
        delay,
        mod_lfo_delay,
    }
}

/// Filter LFO depth and phase increment
pub fn filter_lfo(meta: &SfMeta) -> (u8, u16) {
    let shift = meta.mod_lfo_to_filter_fc as i32;
    if shift == 0 {
        return (0, 0);
    }
    let depth = (cents_ratio(shift) * VIBRATO_RATE_TUNING) as i32;
    let phase = if meta.freq_mod_lfo == 0 {
        8 * 20
    } else {
        to_hz20(meta.freq_mod_lfo)
    };
    (depth as u8, phase.max(1) as u16)
}

/// Filter cutoff in hertz (stored as its low 16 bits)
pub fn cutoff(meta: &SfMeta) -> u16 {
    let fc = if meta.initial_filter_fc < 1 {
        13500
    } else {
        meta.initial_filter_fc
    };
    let fc = if fc > 24000 { 19192 } else { fc };
    to_hz(fc as i32) as u16
}

fn ratio_byte(cents: i32) -> u8 {
    if cents == 0 {
        0
    } else {
        cents_ratio(cents) as i32 as u8
    }
}

/// Mode flags for a sample
///
/// `flags` is the resolved `sampleModes` value. Loop-without-sustain is
/// normally promoted to loop-with-sustain; with `adjust_sample_flags` the
/// modulation sustain and the General MIDI program decide instead.
pub fn sample_modes(
    options: &ConvertOptions,
    sustain_mod_env: i32,
    flags: i32,
    program: u8,
    bank: u16,
) -> u8 {
    let mut result = modes::ENVELOPE;
    result |= if options.eight_bit {
        modes::UNSIGNED
    } else {
        modes::BITS16
    };
    if flags == 3 {
        result |= modes::FAST_RELEASE;
    }

    let mut flags = flags;
    if options.adjust_sample_flags {
        let original = flags;
        if flags != 0 && sustain_mod_env == 0 {
            flags = 3;
        } else if flags != 0 && sustain_mod_env >= 1000 {
            flags = 1;
        } else if bank != DRUM_BANK && flags == 1 && sustains_by_program(program) {
            flags = 3;
        }
        if flags != original {
            tracing::debug!("changed sample flags from {} to {}", original, flags);
        }
    } else if flags == 1 {
        flags = 3;
    }

    if flags == 1 || flags == 3 {
        result |= modes::LOOPING;
    }
    if flags == 3 {
        result |= modes::SUSTAIN;
    }
    result
}

/// General MIDI programs whose loops are held while the key is down:
/// organs, strings, voices, winds, synth leads and pads, and sound effects
fn sustains_by_program(program: u8) -> bool {
    matches!(
        program,
        16..=23 | 40..=44 | 48..=54 | 56..=79 | 80..=103 | 109..=111 | 121..=126
    )
}

/// Volume scale that brings the loud part of a waveform to a common level
pub fn adjust_volume(data: &[i16]) -> u16 {
    let max = data.iter().map(|&s| (s as i32).abs()).max().unwrap_or(0);
    let threshold = 3 * max / 4;
    let (sum, count) = data
        .iter()
        .map(|&s| (s as i32).abs())
        .filter(|&a| a > threshold)
        .fold((0u64, 0u64), |(sum, count), a| (sum + a as u64, count + 1));
    let average = if count > 0 { sum / count } else { 10000 };
    let scale = (32768.0 * 0.875) / average as f64;
    (scale * 255.0) as i32 as u16
}

/// Per-layer gains for 8-bit output, normalized over the layers sounding at middle C
pub fn layer_gains(layers: &[Layer<'_>]) -> Vec<f64> {
    let raw: Vec<(f64, bool)> = layers
        .iter()
        .map(|layer| {
            let mut attenuation = 0i32;
            let mut keys = (0u8, 127u8);
            for g in layer.generators.local_instrument {
                match g.oper {
                    oper::INITIAL_ATTENUATION => attenuation = g.value() as i32,
                    oper::KEY_RANGE => keys = g.lo_hi(),
                    _ => {}
                }
            }
            for g in layer.generators.local_preset {
                match g.oper {
                    oper::INITIAL_ATTENUATION => attenuation += g.value() as i32,
                    oper::KEY_RANGE => keys = g.lo_hi(),
                    _ => {}
                }
            }
            let gain = if attenuation > 0 {
                10f64.powf(-0.005 * attenuation as f64)
            } else {
                1.0
            };
            (gain, keys.0 <= 60 && keys.1 >= 60)
        })
        .collect();

    let total: f64 = raw
        .iter()
        .filter(|(_, middle_c)| *middle_c)
        .map(|(gain, _)| gain)
        .sum();
    raw.into_iter()
        .map(|(gain, _)| {
            if total > 0.0 {
                (gain / total).clamp(0.2, 1.0)
            } else {
                gain
            }
        })
        .collect()
}

/// Builds sample records for the layers of one synthesis request
pub struct Synthesizer<'a> {
    options: &'a ConvertOptions,
    sample_data: &'a [i16],
    /// Program (or drum key) used by the sample-flag heuristic
    program: u8,
    /// Bank the layers were collected from
    bank: u16,
}

impl<'a> Synthesizer<'a> {
    pub fn new(options: &'a ConvertOptions, sample_data: &'a [i16], program: u8, bank: u16) -> Self {
        Self {
            options,
            sample_data,
            program,
            bank,
        }
    }

    /// Build one record per layer, in waiting-list order
    pub fn synthesize(&self, layers: &[Layer<'_>]) -> Result<Vec<SampleRecord>> {
        let gains = layer_gains(layers);
        layers
            .iter()
            .zip(gains)
            .enumerate()
            .map(|(index, (layer, gain))| self.build_record(layer, index, gain))
            .collect()
    }

    /// Build the record for the `index`-th layer
    pub fn build_record(&self, layer: &Layer<'_>, index: usize, gain: f64) -> Result<SampleRecord> {
        let meta = SfMeta::resolve(layer);
        let sample_name = layer.sample.display_name();

        let length = meta.end as i64 - meta.start as i64;
        if length < 0 {
            return Err(Error::NegativeLength {
                sample: sample_name,
            });
        }
        let loop_start = (meta.loop_start as i64 - meta.start as i64).clamp(0, length);
        let loop_end = (meta.loop_end as i64 - meta.start as i64).clamp(0, length);

        // Data begins at the header start; offsets only shape the length and loop points
        let start = layer.sample.start as usize;
        let waveform = start
            .checked_add(length as usize)
            .and_then(|end| self.sample_data.get(start..end))
            .ok_or(Error::SampleOutOfRange {
                sample: sample_name,
            })?;

        let pan = (meta.pan * 256 / 1000 + 127).clamp(0, 255);
        let scale_factor = if meta.keyscale == 100 {
            1024
        } else {
            (meta.keyscale * 1024 / 100).clamp(0, 2048)
        };
        let (root_freq, center) = root_pitch(&meta);

        let volume = peak_volume(meta.initial_attenuation);
        let sustain = sustain_below_peak(sustain_level(meta.sustain_vol_env), volume);
        let envelope = Envelope::new(
            &EnvelopeTimes::from_timecents(
                meta.attack_vol_env,
                meta.hold_vol_env,
                meta.decay_vol_env,
                meta.release_vol_env,
            ),
            volume,
            sustain,
        );
        let mod_envelope = Envelope::new(
            &EnvelopeTimes::from_timecents(
                meta.attack_mod_env,
                meta.hold_mod_env,
                meta.decay_mod_env,
                meta.release_mod_env,
            ),
            volume,
            mod_sustain_level(meta.sustain_mod_env),
        );

        tracing::debug!(
            "layer {} '{}': root {} mHz, volume {}, sustain {}, pan {}",
            index + 1,
            layer.sample.display_name(),
            root_freq,
            volume,
            sustain,
            pan
        );

        let vibrato = vibrato(&meta);
        let (lfo_depth, lfo_phase_increment) = filter_lfo(&meta);
        let eight_bit = self.options.eight_bit;
        let width = if eight_bit { 1 } else { 2 };

        let sample_volume = if self.options.adjust_volume {
            adjust_volume(waveform)
        } else {
            volume as u16
        };

        let data = if eight_bit {
            waveform
                .iter()
                .map(|&s| ((((s >> 8) as f64 * gain) as i32) ^ 0x80) as u8)
                .collect()
        } else {
            waveform.iter().flat_map(|s| s.to_le_bytes()).collect()
        };

        let n = index + 1;
        Ok(SampleRecord {
            name: [
                b's',
                b'm',
                b'p',
                b'0' + (n / 10) as u8,
                b'0' + (n % 10) as u8,
                layer.role.tag(),
                0,
            ],
            fractions: 0,
            data_size: (length * width) as u32,
            loop_start: (loop_start * width) as u32,
            loop_end: (loop_end * width) as u32,
            sample_rate: layer.sample.sample_rate as u16,
            low_freq: key_freq(meta.keymin),
            high_freq: key_freq(meta.keymax),
            root_freq,
            tune: 512,
            balance: 7,
            envelope_rates: envelope.rates,
            envelope_offsets: envelope.offsets,
            tremolo: tremolo(&meta),
            vibrato: vibrato.lfo,
            modes: sample_modes(
                self.options,
                meta.sustain_mod_env,
                meta.mode,
                self.program,
                self.bank,
            ),
            scale_frequency: center,
            scale_factor: scale_factor as u16,
            volume: sample_volume,
            delay: timecents_to_msec(meta.delay_vol_env) as u8,
            exclusive_class: meta.exclusive_class as u8,
            vibrato_delay: vibrato.delay as u8,
            mod_envelope_rates: mod_envelope.rates,
            mod_envelope_offsets: mod_envelope.offsets,
            mod_lfo_delay: vibrato.mod_lfo_delay as u8,
            chorus: meta.chorus as u8,
            reverb: meta.reverb as u8,
            resonance: meta.initial_filter_q.max(0) as u16,
            cutoff: cutoff(&meta),
            mod_env_to_pitch: ratio_byte(meta.mod_env_to_pitch),
            mod_env_to_filter_fc: ratio_byte(meta.mod_env_to_filter_fc as i32),
            mod_lfo_to_filter_fc: ratio_byte(meta.mod_lfo_to_filter_fc as i32),
            keynum_to_mod_env_hold: meta.keynum_to_mod_env_hold as u8,
            keynum_to_mod_env_decay: meta.keynum_to_mod_env_decay as u8,
            keynum_to_vol_env_hold: meta.keynum_to_vol_env_hold as u8,
            keynum_to_vol_env_decay: meta.keynum_to_vol_env_decay as u8,
            pan: pan as u8,
            lfo_phase_increment,
            lfo_depth,
            vendor: if meta.unused5 == -1 {
                255
            } else {
                meta.unused5 as u8
            },
            data,
        })
    }
}
