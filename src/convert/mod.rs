//! SF2 to GUS patch conversion
//!
//! The pipeline runs forward only: the catalog names every slot and
//! counts its velocity splits, the resolver collects the layers of each
//! request, the synthesizer turns them into sample records and the patch
//! writer lays them out behind the header.

pub mod catalog;
pub mod config;
pub mod envelope;
pub mod options;
pub mod resolver;
pub mod synth;
pub mod tables;
pub mod velocity;

pub use catalog::{basename_from_path, Catalog};
pub use options::{ConvertOptions, VelocityOverride};
pub use resolver::{ChannelPass, Request, Resolver};
pub use synth::Synthesizer;
pub use velocity::{SlotKey, VelocityRange, VelocityRangeList, VelocityRegistry};

use crate::error::{Error, Result};
use crate::patch::{PatchHeader, PatchWriter, VelocityLayer};
use crate::sf2::{self, SoundFont};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// One generated patch file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchFile {
    pub slot: SlotKey,
    /// Path relative to the output directory
    pub path: PathBuf,
    pub data: Vec<u8>,
}

/// Result of converting a bank
#[derive(Debug, Clone)]
pub struct Conversion {
    pub catalog: Catalog,
    pub patches: Vec<PatchFile>,
    /// Slots that could not be built, with the reason
    pub failures: Vec<(SlotKey, String)>,
    /// Config file text
    pub config: String,
}

impl Conversion {
    /// Name of the config file, relative to the output directory
    pub fn config_name(&self) -> String {
        format!("{}.cfg", self.catalog.basename)
    }

    /// Create the bank directories and write every patch plus the config file
    pub fn write(&self, output_dir: &Path) -> Result<()> {
        let dirs = self
            .catalog
            .tonebanks
            .values()
            .chain(self.catalog.drumsets.values().map(|kit| &kit.dir));
        for dir in dirs {
            fs::create_dir_all(output_dir.join(dir))?;
        }
        for patch in &self.patches {
            fs::write(output_dir.join(&patch.path), &patch.data)?;
            tracing::info!("wrote {}", patch.path.display());
        }
        fs::write(output_dir.join(self.config_name()), &self.config)?;
        tracing::info!(
            "wrote {} patches to {}",
            self.patches.len(),
            output_dir.display()
        );
        Ok(())
    }
}

/// SF2 to patch converter
#[derive(Debug, Clone, Default)]
pub struct Converter {
    options: ConvertOptions,
}

impl Converter {
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Scan `sf` and settle each slot's primary velocity range
    pub fn catalog(&self, sf: &SoundFont, basename: &str) -> Catalog {
        let mut catalog = Catalog::build(sf, &self.options, basename);
        catalog.sort_velocity_layers(&self.options);
        catalog.shorten_drum_names();
        catalog
    }

    /// Convert a loaded bank in memory
    ///
    /// Slots are built in parallel. A slot that fails is logged, left out
    /// of the patches and marked as not extracted in the config.
    pub fn convert(&self, sf: &SoundFont, basename: &str) -> Conversion {
        let mut catalog = self.catalog(sf, basename);
        let slots: Vec<SlotKey> = catalog.names.keys().copied().collect();

        let results: Vec<(SlotKey, Result<PatchFile>)> = slots
            .par_iter()
            .map(|&slot| (slot, self.build_patch(sf, &catalog, slot)))
            .collect();

        let mut patches = Vec::new();
        let mut failures = Vec::new();
        for (slot, result) in results {
            match result {
                Ok(patch) => patches.push(patch),
                Err(e) => {
                    tracing::warn!("could not create patch for {}: {}", slot, e);
                    catalog.registry.discard(&slot);
                    failures.push((slot, e.to_string()));
                }
            }
        }

        let config = config::render(&sf.info, &catalog);
        Conversion {
            catalog,
            patches,
            failures,
            config,
        }
    }

    /// Build the patch for one slot: a left/mono pass and, for stereo
    /// ranges, a right pass for each velocity range
    pub fn build_patch(&self, sf: &SoundFont, catalog: &Catalog, slot: SlotKey) -> Result<PatchFile> {
        let name = catalog
            .names
            .get(&slot)
            .ok_or(Error::NoRecord { slot })?;
        let path = catalog.patch_path(&slot).ok_or(Error::NoRecord { slot })?;
        let ranges = catalog.registry.get(&slot).ok_or(Error::NoRecord { slot })?;

        let resolver = Resolver::new(sf, &catalog.registry, &self.options);
        let synth = Synthesizer::new(
            &self.options,
            &sf.sample_data,
            slot.program,
            resolver.wanted_bank(&slot),
        );
        let count = if self.options.small { 1 } else { ranges.len() };

        let mut writer = PatchWriter::new();
        for (k, range) in ranges.ranges().iter().take(count).enumerate() {
            let mut passes = vec![ChannelPass::LeftMono];
            if range.right > 0 && !self.options.mono {
                passes.push(ChannelPass::Right);
            }
            for pass in passes {
                tracing::debug!("{}: {} pass, velocity {}-{}", slot, pass.label(), range.velmin, range.velmax);
                let request = Request {
                    slot,
                    velmin: range.velmin,
                    velmax: range.velmax,
                    pass,
                };
                let layers = resolver.resolve(&request)?;
                if k == 0 && pass == ChannelPass::LeftMono {
                    writer.write_header(&self.header(catalog, name, ranges, count, layers.len()));
                }
                for record in synth.synthesize(layers.layers())? {
                    writer.write_sample(&record);
                }
            }
        }
        tracing::debug!("{}: {} bytes", slot, writer.len());

        Ok(PatchFile {
            slot,
            path,
            data: writer.into_bytes(),
        })
    }

    fn header(
        &self,
        catalog: &Catalog,
        name: &str,
        ranges: &VelocityRangeList,
        count: usize,
        waveforms: usize,
    ) -> PatchHeader {
        let layers = ranges
            .ranges()
            .iter()
            .take(count)
            .map(|range| VelocityLayer {
                velmin: range.velmin,
                velmax: range.velmax,
                left: range.left_and_mono() as u8,
                right: if self.options.mono {
                    0
                } else {
                    range.right as u8
                },
            })
            .collect();
        PatchHeader {
            copyright: catalog.copyright.clone(),
            instrument_name: name.to_string(),
            waveforms: waveforms as u16,
            layers,
        }
    }

    /// Load `input`, convert it and, unless `no_write` is set, write the
    /// result under `output_dir`
    pub fn convert_file(&self, input: &Path, output_dir: &Path) -> Result<Conversion> {
        let sf = sf2::load(input)?;
        let basename = basename_from_path(input);
        tracing::info!(
            "{}: {} presets, {} samples",
            input.display(),
            sf.real_presets().len(),
            sf.samples.len()
        );
        let conversion = self.convert(&sf, &basename);
        if !self.options.no_write {
            conversion.write(output_dir)?;
        }
        Ok(conversion)
    }
}
