//! Zone resolver: collects the sample layers answering one synthesis request

use super::options::ConvertOptions;
use super::velocity::{SlotKey, VelocityRegistry};
use crate::error::{Error, Result};
use crate::sf2::generator::walk_preset;
use crate::sf2::{ChannelRole, LayerGenerators, SampleHeader, SoundFont};

/// Most layers collected for one request
pub const MAX_LAYERS: usize = 256;

/// Which stereo side a request collects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelPass {
    /// Left and mono samples
    LeftMono,
    /// Right samples only
    Right,
}

impl ChannelPass {
    pub fn accepts(&self, role: ChannelRole) -> bool {
        match (self, role) {
            (ChannelPass::LeftMono, ChannelRole::Right) => false,
            (ChannelPass::Right, ChannelRole::Left | ChannelRole::Mono) => false,
            _ => true,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChannelPass::LeftMono => "left/mono",
            ChannelPass::Right => "right",
        }
    }
}

/// One synthesis request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    pub slot: SlotKey,
    pub velmin: u8,
    pub velmax: u8,
    pub pass: ChannelPass,
}

/// A sample chosen for a request, with the generator lists that shape it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layer<'a> {
    pub sample_index: usize,
    pub sample: &'a SampleHeader,
    pub role: ChannelRole,
    pub generators: LayerGenerators<'a>,
}

/// Bounded list of layers awaiting synthesis
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaitingList<'a> {
    layers: Vec<Layer<'a>>,
    dropped: usize,
}

impl<'a> WaitingList<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layer, or count it as dropped once the list is full
    pub fn push(&mut self, layer: Layer<'a>) -> bool {
        if self.layers.len() >= MAX_LAYERS {
            self.dropped += 1;
            return false;
        }
        self.layers.push(layer);
        true
    }

    pub fn layers(&self) -> &[Layer<'a>] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Layers that did not fit
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

/// Resolves requests against a loaded bank and its velocity registry
pub struct Resolver<'a> {
    sf: &'a SoundFont,
    registry: &'a VelocityRegistry,
    force_drum: bool,
}

impl<'a> Resolver<'a> {
    pub fn new(sf: &'a SoundFont, registry: &'a VelocityRegistry, options: &ConvertOptions) -> Self {
        Self {
            sf,
            registry,
            force_drum: options.force_drum,
        }
    }

    /// Bank number of the presets serving `slot`
    pub fn wanted_bank(&self, slot: &SlotKey) -> u16 {
        match (slot.drum, self.force_drum) {
            (true, true) => 0,
            (true, false) => 128,
            (false, _) => slot.bank as u16,
        }
    }

    fn find_preset(&self, slot: &SlotKey) -> Option<usize> {
        let bank = self.wanted_bank(slot);
        let program = if slot.drum { slot.bank } else { slot.program } as u16;
        self.sf
            .real_presets()
            .iter()
            .position(|p| p.bank == bank && p.program == program)
    }

    /// Collect the layers matching `request`, without checking them against the registry
    pub fn collect(&self, request: &Request) -> WaitingList<'a> {
        let mut list = WaitingList::new();
        let Some(preset) = self.find_preset(&request.slot) else {
            return list;
        };
        let (key_lo, key_hi) = if request.slot.drum {
            (request.slot.program, request.slot.program)
        } else {
            (0, 127)
        };
        let sf = self.sf;

        walk_preset(sf, preset, |zone| {
            if zone.velmin != request.velmin || zone.velmax != request.velmax {
                return;
            }
            let key_ok = if request.slot.drum {
                key_lo >= zone.keymin && key_lo <= zone.keymax
            } else {
                zone.keymin >= key_lo && zone.keymax <= key_hi
            };
            if !key_ok {
                return;
            }
            let Some(sample) = sf.samples.get(zone.sample_index) else {
                return;
            };
            if sample.is_linked() || sample.is_rom() {
                return;
            }
            let role = sample.role();
            if !request.pass.accepts(role) {
                return;
            }
            list.push(Layer {
                sample_index: zone.sample_index,
                sample,
                role,
                generators: zone.generators,
            });
        });
        list
    }

    /// Collect the layers for `request` and check them against the catalog's counts
    pub fn resolve(&self, request: &Request) -> Result<WaitingList<'a>> {
        let slot = request.slot;
        let list = self.collect(request);
        if list.dropped() > 0 {
            tracing::warn!(
                "{}: too many layers, dropped {} beyond {}",
                slot,
                list.dropped(),
                MAX_LAYERS
            );
        }
        if list.is_empty() {
            return Err(Error::NoLayers { slot });
        }

        let ranges = self.registry.get(&slot).ok_or(Error::NoRecord { slot })?;
        let index = ranges
            .find(request.velmin, request.velmax)
            .ok_or(Error::UnknownVelocityRange {
                slot,
                velmin: request.velmin,
                velmax: request.velmax,
            })?;
        let range = ranges.ranges()[index];
        let expected = match request.pass {
            ChannelPass::LeftMono => range.left_and_mono(),
            ChannelPass::Right => range.right,
        } as usize;
        if expected != list.len() {
            return Err(Error::LayerCountMismatch {
                slot,
                velmin: request.velmin,
                velmax: request.velmax,
                expected,
                found: list.len(),
                pass: request.pass.label(),
            });
        }
        Ok(list)
    }
}
