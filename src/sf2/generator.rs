//! Generator operators, zone views and the preset/instrument zone walk

use super::types::{Generator, SoundFont};

/// SF2 generator operator numbers
pub mod oper {
    pub const START_ADDRS_OFFSET: u16 = 0;
    pub const END_ADDRS_OFFSET: u16 = 1;
    pub const STARTLOOP_ADDRS_OFFSET: u16 = 2;
    pub const ENDLOOP_ADDRS_OFFSET: u16 = 3;
    pub const START_ADDRS_COARSE_OFFSET: u16 = 4;
    pub const MOD_LFO_TO_PITCH: u16 = 5;
    pub const VIB_LFO_TO_PITCH: u16 = 6;
    pub const MOD_ENV_TO_PITCH: u16 = 7;
    pub const INITIAL_FILTER_FC: u16 = 8;
    pub const INITIAL_FILTER_Q: u16 = 9;
    pub const MOD_LFO_TO_FILTER_FC: u16 = 10;
    pub const MOD_ENV_TO_FILTER_FC: u16 = 11;
    pub const END_ADDRS_COARSE_OFFSET: u16 = 12;
    pub const MOD_LFO_TO_VOLUME: u16 = 13;
    pub const CHORUS_EFFECTS_SEND: u16 = 15;
    pub const REVERB_EFFECTS_SEND: u16 = 16;
    pub const PAN: u16 = 17;
    pub const DELAY_MOD_LFO: u16 = 21;
    pub const FREQ_MOD_LFO: u16 = 22;
    pub const DELAY_VIB_LFO: u16 = 23;
    pub const FREQ_VIB_LFO: u16 = 24;
    pub const DELAY_MOD_ENV: u16 = 25;
    pub const ATTACK_MOD_ENV: u16 = 26;
    pub const HOLD_MOD_ENV: u16 = 27;
    pub const DECAY_MOD_ENV: u16 = 28;
    pub const SUSTAIN_MOD_ENV: u16 = 29;
    pub const RELEASE_MOD_ENV: u16 = 30;
    pub const KEYNUM_TO_MOD_ENV_HOLD: u16 = 31;
    pub const KEYNUM_TO_MOD_ENV_DECAY: u16 = 32;
    pub const DELAY_VOL_ENV: u16 = 33;
    pub const ATTACK_VOL_ENV: u16 = 34;
    pub const HOLD_VOL_ENV: u16 = 35;
    pub const DECAY_VOL_ENV: u16 = 36;
    pub const SUSTAIN_VOL_ENV: u16 = 37;
    pub const RELEASE_VOL_ENV: u16 = 38;
    pub const KEYNUM_TO_VOL_ENV_HOLD: u16 = 39;
    pub const KEYNUM_TO_VOL_ENV_DECAY: u16 = 40;
    pub const INSTRUMENT: u16 = 41;
    pub const KEY_RANGE: u16 = 43;
    pub const VEL_RANGE: u16 = 44;
    pub const STARTLOOP_ADDRS_COARSE_OFFSET: u16 = 45;
    pub const KEYNUM: u16 = 46;
    pub const VELOCITY: u16 = 47;
    pub const INITIAL_ATTENUATION: u16 = 48;
    pub const ENDLOOP_ADDRS_COARSE_OFFSET: u16 = 50;
    pub const COARSE_TUNE: u16 = 51;
    pub const FINE_TUNE: u16 = 52;
    pub const SAMPLE_ID: u16 = 53;
    pub const SAMPLE_MODES: u16 = 54;
    pub const SCALE_TUNING: u16 = 56;
    pub const EXCLUSIVE_CLASS: u16 = 57;
    pub const OVERRIDING_ROOT_KEY: u16 = 58;
    pub const UNUSED5: u16 = 59;
}

/// A zone's generator list plus whether it acts as the global zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedZone<'a> {
    pub generators: &'a [Generator],
    pub is_global: bool,
}

impl<'a> ResolvedZone<'a> {
    /// Classify a zone by its trailing generator
    pub fn new(generators: &'a [Generator], terminal_oper: u16) -> Self {
        let is_global = generators
            .last()
            .map(|g| g.oper != terminal_oper)
            .unwrap_or(false);
        Self {
            generators,
            is_global,
        }
    }

    /// Index referenced by the terminal generator, if this is a concrete zone
    pub fn terminal(&self, terminal_oper: u16) -> Option<usize> {
        self.generators
            .last()
            .filter(|g| g.oper == terminal_oper)
            .map(|g| g.amount as usize)
    }
}

/// The four generator lists that shape one layer, in application order
///
/// An absent global zone is an empty slice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerGenerators<'a> {
    pub global_instrument: &'a [Generator],
    pub local_instrument: &'a [Generator],
    pub global_preset: &'a [Generator],
    pub local_preset: &'a [Generator],
}

/// Key and velocity ranges declared by a zone (or inherited from its global zone)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZoneRange {
    pub key: Option<(u8, u8)>,
    pub vel: Option<(u8, u8)>,
}

impl ZoneRange {
    /// Overlay the ranges found in `gens`; `keyRange` only counts as the first generator
    pub fn overlay(mut self, gens: &[Generator]) -> Self {
        if let Some(first) = gens.first() {
            if first.oper == oper::KEY_RANGE {
                self.key = Some(first.lo_hi());
            }
        }
        if let Some(vel) = gens.iter().rev().find(|g| g.oper == oper::VEL_RANGE) {
            self.vel = Some(vel.lo_hi());
        }
        self
    }
}

/// Narrow an instrument range by a preset range that lies inside it
pub fn narrow(instrument: Option<(u8, u8)>, preset: Option<(u8, u8)>) -> (u8, u8) {
    let (imin, imax) = instrument.unwrap_or((0, 127));
    match preset {
        Some((pmin, pmax)) if pmin >= imin && pmax <= imax => (pmin, pmax),
        _ => (imin, imax),
    }
}

/// One concrete instrument zone reached from a preset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalZone<'a> {
    pub sample_index: usize,
    pub keymin: u8,
    pub keymax: u8,
    pub velmin: u8,
    pub velmax: u8,
    pub generators: LayerGenerators<'a>,
}

/// Visit every sample-bearing instrument zone reachable from preset `preset_index`
///
/// Only a leading zone may be global; later zones without a terminal
/// generator are ignored.
pub fn walk_preset<'a>(
    sf: &'a SoundFont,
    preset_index: usize,
    mut visit: impl FnMut(TerminalZone<'a>),
) {
    let mut global_preset: &[Generator] = &[];
    let mut global_prange = ZoneRange::default();

    for (pi, pgen) in sf.preset_zones(preset_index).into_iter().enumerate() {
        let pzone = ResolvedZone::new(pgen, oper::INSTRUMENT);
        let prange = global_prange.overlay(pgen);
        if pzone.is_global {
            if pi == 0 {
                global_preset = pgen;
                global_prange = prange;
            } else {
                tracing::debug!("ignoring non-leading global zone in preset {}", preset_index);
            }
            continue;
        }
        let Some(inst) = pzone.terminal(oper::INSTRUMENT) else {
            continue;
        };
        if inst + 1 >= sf.instruments.len() {
            tracing::warn!("preset {} references missing instrument {}", preset_index, inst);
            continue;
        }

        let mut global_instrument: &[Generator] = &[];
        let mut global_irange = ZoneRange::default();
        for (ii, igen) in sf.instrument_zones(inst).into_iter().enumerate() {
            let izone = ResolvedZone::new(igen, oper::SAMPLE_ID);
            let irange = global_irange.overlay(igen);
            if izone.is_global {
                if ii == 0 {
                    global_instrument = igen;
                    global_irange = irange;
                }
                continue;
            }
            let Some(sample_index) = izone.terminal(oper::SAMPLE_ID) else {
                continue;
            };
            let (keymin, keymax) = narrow(irange.key, prange.key);
            let (velmin, velmax) = narrow(irange.vel, prange.vel);
            visit(TerminalZone {
                sample_index,
                keymin,
                keymax,
                velmin,
                velmax,
                generators: LayerGenerators {
                    global_instrument,
                    local_instrument: igen,
                    global_preset,
                    local_preset: pgen,
                },
            });
        }
    }
}
