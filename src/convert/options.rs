//! Conversion options

use super::velocity::SlotKey;
use crate::error::Error;
use std::collections::HashMap;
use std::str::FromStr;

/// A forced primary velocity layer for one slot, written `bank:program=layer`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VelocityOverride {
    pub bank: u8,
    pub program: u8,
    pub layer: usize,
}

impl FromStr for VelocityOverride {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidOverride(s.to_string());
        let (slot, layer) = s.split_once('=').ok_or_else(invalid)?;
        let (bank, program) = slot.split_once(':').ok_or_else(invalid)?;
        let bank: u8 = bank.trim().parse().map_err(|_| invalid())?;
        let program: u8 = program.trim().parse().map_err(|_| invalid())?;
        let layer: usize = layer.trim().parse().map_err(|_| invalid())?;
        if bank > 127 || program > 127 || layer > 127 {
            return Err(invalid());
        }
        Ok(Self {
            bank,
            program,
            layer,
        })
    }
}

/// Options controlling a conversion
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Write 8-bit waveforms instead of 16-bit
    pub eight_bit: bool,
    /// Skip right-channel passes
    pub mono: bool,
    /// Only write the primary velocity layer
    pub small: bool,
    /// Treat every preset as a drum kit
    pub force_drum: bool,
    /// Derive looping from General MIDI program categories
    pub adjust_sample_flags: bool,
    /// Derive the sample volume word from the waveform peak level
    pub adjust_volume: bool,
    /// Build everything but write no files
    pub no_write: bool,
    melody_layers: HashMap<(u8, u8), usize>,
    drum_layers: HashMap<(u8, u8), usize>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            eight_bit: false,
            mono: false,
            small: false,
            force_drum: false,
            adjust_sample_flags: false,
            adjust_volume: true,
            no_write: false,
            melody_layers: HashMap::new(),
            drum_layers: HashMap::new(),
        }
    }
}

impl ConvertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_melody_override(&mut self, o: VelocityOverride) {
        self.melody_layers.insert((o.bank, o.program), o.layer);
    }

    pub fn add_drum_override(&mut self, o: VelocityOverride) {
        self.drum_layers.insert((o.bank, o.program), o.layer);
    }

    /// Forced primary layer for a slot, if any
    pub fn primary_layer(&self, slot: &SlotKey) -> Option<usize> {
        let table = if slot.drum {
            &self.drum_layers
        } else {
            &self.melody_layers
        };
        table.get(&(slot.bank, slot.program)).copied()
    }
}
