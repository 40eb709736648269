//! Bank catalog: which voices and drum kits exist, their names, and the
//! velocity splits of each slot

use super::options::ConvertOptions;
use super::velocity::{SlotKey, VelocityRegistry};
use crate::sf2::generator::walk_preset;
use crate::sf2::SoundFont;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Output directories of one drum kit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrumSet {
    /// Directory holding the kit's patches
    pub dir: String,
    /// Kit name as written in the config file
    pub short_name: String,
}

/// Everything learned about a bank before any patch is built
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub basename: String,
    /// Text for the patch header copyright block
    pub copyright: String,
    /// Melodic banks and their directories
    pub tonebanks: BTreeMap<u8, String>,
    pub drumsets: BTreeMap<u8, DrumSet>,
    /// Display names of every voice and drum slot
    pub names: BTreeMap<SlotKey, String>,
    pub registry: VelocityRegistry,
}

impl Catalog {
    /// Scan every preset of `sf`, naming slots and counting their samples
    pub fn build(sf: &SoundFont, options: &ConvertOptions, basename: &str) -> Self {
        let mut names = BTreeMap::new();
        let mut registry = VelocityRegistry::new();
        let mut banks = Vec::new();
        let mut drumsets = BTreeMap::new();

        for (index, preset) in sf.real_presets().iter().enumerate() {
            if sf.preset_zones(index).is_empty() {
                continue;
            }
            let drum = preset.bank == 128 || options.force_drum;
            let preset_name = sanitize_name(&preset.name);
            let (Ok(program), Ok(bank)) = (u8::try_from(preset.program), u8::try_from(preset.bank))
            else {
                tracing::warn!("skipping preset '{}' with bank {}", preset_name, preset.bank);
                continue;
            };
            if program > 127 || (!drum && bank > 127) {
                tracing::warn!("skipping preset '{}' with bank {}", preset_name, preset.bank);
                continue;
            }

            if drum {
                drumsets.entry(program).or_insert_with(|| {
                    tracing::info!("drumset {}: {}", program, preset_name);
                    DrumSet {
                        dir: format!("{}-{}", basename, preset_name),
                        short_name: preset_name.clone(),
                    }
                });
            } else {
                if !banks.contains(&bank) {
                    tracing::info!("tonebank {}", bank);
                    banks.push(bank);
                }
                names
                    .entry(SlotKey::melodic(bank, program))
                    .or_insert_with(|| preset_name.clone());
            }

            walk_preset(sf, index, |zone| {
                let Some(sample) = sf.samples.get(zone.sample_index) else {
                    tracing::warn!("preset '{}' references missing sample {}", preset_name, zone.sample_index);
                    return;
                };
                if sample.is_linked() {
                    tracing::debug!("skipping linked sample '{}'", sample.display_name());
                    return;
                }
                if sample.is_rom() {
                    tracing::debug!("skipping ROM sample '{}'", sample.display_name());
                    return;
                }
                let role = sample.role();
                if drum {
                    for key in zone.keymin..=zone.keymax {
                        let slot = SlotKey::drum(program, key);
                        names
                            .entry(slot)
                            .or_insert_with(|| sanitize_name(&sample.name));
                        registry.record(slot, zone.velmin, zone.velmax, role);
                    }
                } else {
                    let slot = SlotKey::melodic(bank, program);
                    registry.record(slot, zone.velmin, zone.velmax, role);
                }
            });
        }

        let tonebanks = banks
            .iter()
            .map(|&bank| {
                let dir = if banks.len() == 1 {
                    basename.to_string()
                } else {
                    format!("{}-B{}", basename, bank)
                };
                (bank, dir)
            })
            .collect();

        Self {
            basename: basename.to_string(),
            copyright: sf
                .engineer()
                .map(|eng| format!("Made by {}", eng))
                .unwrap_or_default(),
            tonebanks,
            drumsets,
            names,
            registry,
        }
    }

    /// Move every slot's primary velocity range to the front
    pub fn sort_velocity_layers(&mut self, options: &ConvertOptions) {
        let slots: Vec<SlotKey> = self.registry.slots().copied().collect();
        for slot in slots {
            self.registry
                .select_primary(&slot, options.primary_layer(&slot));
        }
    }

    /// Drop the `-L` suffix from drum names whose primary range is stereo
    pub fn shorten_drum_names(&mut self) {
        for (slot, name) in self.names.iter_mut() {
            if !slot.drum {
                continue;
            }
            let stereo = self
                .registry
                .get(slot)
                .and_then(|list| list.primary())
                .map(|range| range.right > 0)
                .unwrap_or(false);
            if stereo && name.len() > 4 && name.ends_with("-L") {
                name.truncate(name.len() - 2);
            }
        }
    }

    /// Directory of a slot's patch file
    pub fn slot_dir(&self, slot: &SlotKey) -> Option<&str> {
        if slot.drum {
            self.drumsets.get(&slot.bank).map(|d| d.dir.as_str())
        } else {
            self.tonebanks.get(&slot.bank).map(String::as_str)
        }
    }

    /// Relative path of a slot's patch file
    pub fn patch_path(&self, slot: &SlotKey) -> Option<PathBuf> {
        let dir = self.slot_dir(slot)?;
        let name = self.names.get(slot)?;
        Some(PathBuf::from(dir).join(format!("{}.pat", name)))
    }
}

/// Turn a 20-byte SoundFont name into something usable as a file name
///
/// Trailing blanks are trimmed, shell-unfriendly characters are folded and
/// embedded blanks are squeezed out.
pub fn sanitize_name(raw: &[u8; 20]) -> String {
    let mut buf = [0u8; 21];
    for (dst, &src) in buf.iter_mut().zip(raw.iter().take_while(|&&b| b != 0)) {
        *dst = src;
    }

    let mut i = 19;
    while i > 4 && buf[i] == b' ' {
        buf[i] = 0;
        i -= 1;
    }
    let mut end = i + 1;

    for (i, c) in buf[..end].iter_mut().enumerate() {
        *c = match *c {
            b'/' if i == 0 => b' ',
            b'/' => b'.',
            b'\\' | b'#' | b'|' | b'&' | b'*' | b'!' | b'\'' | b'"' | b'?' | b'~' | b']'
            | b')' | b'>' => b' ',
            b'[' | b'(' => b'-',
            b':' | b'<' => b'_',
            other => other,
        };
    }
    // A removal skips the character after it, hence two passes.
    for _ in 0..2 {
        let mut i = 0;
        while i < end {
            if buf[i] == b' ' {
                buf.copy_within(i + 1..end + 1, i);
                end -= 1;
            }
            i += 1;
        }
    }

    let mut len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    while len > 3 && buf[len - 1] == b' ' {
        len -= 1;
    }
    String::from_utf8_lossy(&buf[..len]).into_owned()
}

/// Base name for output files, derived from the SoundFont file name
pub fn basename_from_path(path: &std::path::Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "soundfont".to_string())
        .replace([' ', '#'], "_")
}
