//! Integration tests for SoundFont conversion
//!
//! These tests build small SF2 banks in memory, convert them and check the
//! generated patches using the PatchReader/PatchJson models

use assert_approx_eq::assert_approx_eq;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::tempdir;
use unsf::convert::{ChannelPass, Request, Resolver, SlotKey};
use unsf::patch::{modes, Patch, PatchJson, PatchReader};
use unsf::sf2::generator::walk_preset;
use unsf::sf2::{oper, sample_type, ChannelRole, Generator, SoundFont};
use unsf::{Conversion, ConvertOptions, Converter, Error};

// =============================================================================
// SF2 builder
// =============================================================================

struct TestSample {
    name: String,
    data: Vec<i16>,
    loop_start: u32,
    loop_end: u32,
    sample_type: u16,
}

/// Writes a minimal RIFF `sfbk` file
#[derive(Default)]
struct Sf2Builder {
    info: Vec<([u8; 4], String)>,
    samples: Vec<TestSample>,
    instruments: Vec<(String, Vec<Vec<Generator>>)>,
    presets: Vec<(String, u16, u16, Vec<Vec<Generator>>)>,
}

impl Sf2Builder {
    fn new() -> Self {
        Self::default()
    }

    fn info(mut self, id: &[u8; 4], text: &str) -> Self {
        self.info.push((*id, text.to_string()));
        self
    }

    /// Add a sample with loop points relative to its start
    fn sample(mut self, name: &str, data: Vec<i16>, loop_start: u32, loop_end: u32, kind: u16) -> Self {
        self.samples.push(TestSample {
            name: name.to_string(),
            data,
            loop_start,
            loop_end,
            sample_type: kind,
        });
        self
    }

    fn instrument(mut self, name: &str, zones: Vec<Vec<Generator>>) -> Self {
        self.instruments.push((name.to_string(), zones));
        self
    }

    fn preset(mut self, name: &str, bank: u16, program: u16, zones: Vec<Vec<Generator>>) -> Self {
        self.presets.push((name.to_string(), bank, program, zones));
        self
    }

    fn build(&self) -> Vec<u8> {
        let mut info_chunks = vec![chunk(b"ifil", &[2, 0, 1, 0])];
        for (id, text) in &self.info {
            let mut body = text.as_bytes().to_vec();
            body.push(0);
            info_chunks.push(chunk(id, &body));
        }

        let mut smpl = Vec::new();
        let mut shdr = Vec::new();
        let mut pos = 0u32;
        for s in &self.samples {
            for v in &s.data {
                smpl.extend_from_slice(&v.to_le_bytes());
            }
            let start = pos;
            let end = pos + s.data.len() as u32;
            shdr.extend_from_slice(&name20(&s.name));
            for v in [start, end, start + s.loop_start, start + s.loop_end, 22050] {
                shdr.extend_from_slice(&v.to_le_bytes());
            }
            shdr.push(60);
            shdr.push(0);
            shdr.extend_from_slice(&0u16.to_le_bytes());
            shdr.extend_from_slice(&s.sample_type.to_le_bytes());
            smpl.extend_from_slice(&[0u8; 92]);
            pos = end + 46;
        }
        shdr.extend_from_slice(&name20("EOS"));
        shdr.extend_from_slice(&[0u8; 26]);

        let (inst, ibag, igen) = zone_chunks(
            self.instruments.iter().map(|(name, zones)| (name.as_str(), None, zones)),
            "EOI",
        );
        let (phdr, pbag, pgen) = zone_chunks(
            self.presets
                .iter()
                .map(|(name, bank, program, zones)| (name.as_str(), Some((*program, *bank)), zones)),
            "EOP",
        );

        riff(&[
            list(b"INFO", &info_chunks),
            list(b"sdta", &[chunk(b"smpl", &smpl)]),
            list(
                b"pdta",
                &[
                    chunk(b"phdr", &phdr),
                    chunk(b"pbag", &pbag),
                    chunk(b"pmod", &[0u8; 10]),
                    chunk(b"pgen", &pgen),
                    chunk(b"inst", &inst),
                    chunk(b"ibag", &ibag),
                    chunk(b"imod", &[0u8; 10]),
                    chunk(b"igen", &igen),
                    chunk(b"shdr", &shdr),
                ],
            ),
        ])
    }

    fn soundfont(&self) -> SoundFont {
        unsf::sf2::parse(&self.build()).expect("Failed to parse built SoundFont")
    }
}

/// Header, bag and generator chunks for presets (with program/bank) or instruments
fn zone_chunks<'a>(
    headers: impl Iterator<Item = (&'a str, Option<(u16, u16)>, &'a Vec<Vec<Generator>>)>,
    terminal: &str,
) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    let mut hdr = Vec::new();
    let mut bag = Vec::new();
    let mut gen = Vec::new();
    let mut bag_count = 0u16;
    let mut gen_count = 0u16;

    let write_header = |hdr: &mut Vec<u8>, name: &str, ids: Option<(u16, u16)>, bag_index: u16| {
        hdr.extend_from_slice(&name20(name));
        if let Some((program, bank)) = ids {
            hdr.extend_from_slice(&program.to_le_bytes());
            hdr.extend_from_slice(&bank.to_le_bytes());
            hdr.extend_from_slice(&bag_index.to_le_bytes());
            hdr.extend_from_slice(&[0u8; 12]);
        } else {
            hdr.extend_from_slice(&bag_index.to_le_bytes());
        }
    };

    for (name, ids, zones) in headers {
        write_header(&mut hdr, name, ids, bag_count);
        for zone in zones {
            bag.extend_from_slice(&gen_count.to_le_bytes());
            bag.extend_from_slice(&0u16.to_le_bytes());
            bag_count += 1;
            for g in zone {
                gen.extend_from_slice(&g.oper.to_le_bytes());
                gen.extend_from_slice(&g.amount.to_le_bytes());
                gen_count += 1;
            }
        }
    }
    let terminal_ids = (terminal == "EOP").then_some((0, 0));
    write_header(&mut hdr, terminal, terminal_ids, bag_count);
    bag.extend_from_slice(&gen_count.to_le_bytes());
    bag.extend_from_slice(&0u16.to_le_bytes());
    gen.extend_from_slice(&[0u8; 4]);
    (hdr, bag, gen)
}

fn name20(name: &str) -> [u8; 20] {
    let mut out = [0u8; 20];
    for (dst, src) in out.iter_mut().zip(name.bytes()) {
        *dst = src;
    }
    out
}

fn chunk(id: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = id.to_vec();
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    if body.len() & 1 == 1 {
        out.push(0);
    }
    out
}

fn list(kind: &[u8; 4], chunks: &[Vec<u8>]) -> Vec<u8> {
    let mut body = kind.to_vec();
    for c in chunks {
        body.extend_from_slice(c);
    }
    chunk(b"LIST", &body)
}

fn riff(lists: &[Vec<u8>]) -> Vec<u8> {
    let mut body = b"sfbk".to_vec();
    for l in lists {
        body.extend_from_slice(l);
    }
    chunk(b"RIFF", &body)
}

// =============================================================================
// Helpers
// =============================================================================

fn ramp(len: usize) -> Vec<i16> {
    (0..len).map(|i| (i as i16 - 16) * 1000).collect()
}

fn key_range(lo: u8, hi: u8) -> Generator {
    Generator::range(oper::KEY_RANGE, lo, hi)
}

fn vel_range(lo: u8, hi: u8) -> Generator {
    Generator::range(oper::VEL_RANGE, lo, hi)
}

fn sample_id(index: u16) -> Generator {
    Generator::new(oper::SAMPLE_ID, index as i16)
}

fn instrument(index: u16) -> Generator {
    Generator::new(oper::INSTRUMENT, index as i16)
}

/// One melodic preset at bank 0 program 0 playing the given instrument zones
fn single_preset(name: &str, zones: Vec<Vec<Generator>>) -> Sf2Builder {
    Sf2Builder::new()
        .info(b"INAM", "Test Font")
        .info(b"IENG", "Tester")
        .sample("PianoC", ramp(32), 8, 24, sample_type::MONO)
        .instrument(name, zones)
        .preset(name, 0, 0, vec![vec![instrument(0)]])
}

/// Write `builder` to a temporary `test.sf2`, convert it and return the output directory
fn convert_in_tempdir(builder: &Sf2Builder, options: ConvertOptions) -> (tempfile::TempDir, Conversion) {
    let dir = tempdir().unwrap();
    let input = dir.path().join("test.sf2");
    std::fs::write(&input, builder.build()).expect("Failed to write SoundFont");
    let output = dir.path().join("out");
    let conversion = Converter::new(options)
        .convert_file(&input, &output)
        .expect("Conversion failed");
    (dir, conversion)
}

fn read_patch(path: &Path) -> Patch {
    let data = std::fs::read(path).expect("Failed to read patch");
    PatchReader::new(&data).parse().expect("Failed to parse patch")
}

fn patch_of(conversion: &Conversion, slot: SlotKey) -> Patch {
    let file = conversion
        .patches
        .iter()
        .find(|p| p.slot == slot)
        .expect("patch should exist for slot");
    PatchReader::new(&file.data).parse().expect("Failed to parse patch")
}

fn out_path(dir: &tempfile::TempDir, rel: &str) -> PathBuf {
    dir.path().join("out").join(rel)
}

// =============================================================================
// Single sample
// =============================================================================

#[test]
fn test_single_mono_sample() {
    let builder = single_preset("Piano", vec![vec![key_range(0, 127), vel_range(0, 127), sample_id(0)]]);
    let (dir, conversion) = convert_in_tempdir(&builder, ConvertOptions::new());

    let path = out_path(&dir, "test/Piano.pat");
    assert!(path.exists(), "patch file should be written at {}", path.display());
    assert!(out_path(&dir, "test.cfg").exists(), "config file should be written");
    assert!(conversion.failures.is_empty());

    let patch = read_patch(&path);
    assert_eq!(patch.header.waveforms, 1);
    assert_eq!(patch.header.instrument_name, "Piano");
    assert_eq!(patch.header.copyright, "Made by Tester");
    assert_eq!(patch.header.layers.len(), 1);
    assert_eq!((patch.header.layers[0].velmin, patch.header.layers[0].velmax), (0, 127));
    assert_eq!(patch.header.layers[0].left, 1);
    assert_eq!(patch.header.layers[0].right, 0);

    assert_eq!(patch.samples.len(), 1);
    let sample = &patch.samples[0];
    assert_eq!(sample.name_str(), "smp01M");
    assert_eq!(sample.data_size, 64, "16-bit waveform of 32 samples");
    assert_eq!(sample.sample_rate, 22050);
    assert!(sample.modes & modes::ENVELOPE != 0);
    assert!(sample.modes & modes::BITS16 != 0);
    assert!(sample.modes & modes::LOOPING == 0, "no sampleModes means no looping");

    let expected: Vec<u8> = ramp(32).iter().flat_map(|s| s.to_le_bytes()).collect();
    assert_eq!(sample.data, expected, "16-bit waveform is copied unscaled");
}

#[test]
fn test_loop_points_relative_to_sample_start() {
    let builder = Sf2Builder::new()
        .sample("First", ramp(10), 0, 10, sample_type::MONO)
        .sample("Second", ramp(32), 4, 20, sample_type::MONO)
        .instrument("Lead", vec![vec![sample_id(1)]])
        .preset("Lead", 0, 0, vec![vec![instrument(0)]]);
    let sf = builder.soundfont();
    assert!(sf.samples[1].start > 0);

    let conversion = Converter::default().convert(&sf, "test");
    let patch = patch_of(&conversion, SlotKey::melodic(0, 0));
    assert_eq!(patch.header.waveforms, 1);
    assert_eq!(patch.samples[0].loop_start, 4 * 2);
    assert_eq!(patch.samples[0].loop_end, 20 * 2);
}

#[test]
fn test_loop_end_clamped_to_length() {
    let builder = Sf2Builder::new()
        .sample("Over", ramp(16), 2, 40, sample_type::MONO)
        .instrument("Over", vec![vec![sample_id(0)]])
        .preset("Over", 0, 0, vec![vec![instrument(0)]]);
    let conversion = Converter::default().convert(&builder.soundfont(), "test");
    let patch = patch_of(&conversion, SlotKey::melodic(0, 0));
    assert_eq!(patch.samples[0].loop_end, 16 * 2);
}

#[test]
fn test_sample_modes_promoted_to_sustain() {
    let builder = single_preset(
        "Organ",
        vec![vec![Generator::new(oper::SAMPLE_MODES, 1), sample_id(0)]],
    );
    let conversion = Converter::default().convert(&builder.soundfont(), "test");
    let patch = patch_of(&conversion, SlotKey::melodic(0, 0));
    let flags = patch.samples[0].modes;
    assert!(flags & modes::LOOPING != 0);
    assert!(flags & modes::SUSTAIN != 0);
}

#[test]
fn test_eight_bit_output() {
    let builder = single_preset("Piano", vec![vec![sample_id(0)]]);
    let mut options = ConvertOptions::new();
    options.eight_bit = true;
    let conversion = Converter::new(options).convert(&builder.soundfont(), "test");
    let sample = &patch_of(&conversion, SlotKey::melodic(0, 0)).samples[0];
    assert_eq!(sample.data_size, 32);
    assert!(sample.modes & modes::UNSIGNED != 0);
    assert!(sample.modes & modes::BITS16 == 0);
    assert_eq!(sample.data[16], 0x80, "silence maps to the unsigned midpoint");
}

#[test]
fn test_attenuation_sets_volume() {
    let builder = single_preset(
        "Soft",
        vec![vec![Generator::new(oper::INITIAL_ATTENUATION, 200), sample_id(0)]],
    );
    let mut options = ConvertOptions::new();
    options.adjust_volume = false;
    let conversion = Converter::new(options).convert(&builder.soundfont(), "test");
    let sample = &patch_of(&conversion, SlotKey::melodic(0, 0)).samples[0];

    let expected = 255.0 * (1.0 - 2.0 / (1200.0 * 2f64.log10()));
    assert_approx_eq!(sample.volume as f64, expected, 1.0);
}

// =============================================================================
// Velocity layers
// =============================================================================

fn two_velocity_layers() -> Sf2Builder {
    Sf2Builder::new()
        .sample("Soft", ramp(32), 0, 32, sample_type::MONO)
        .sample("Loud", ramp(24), 0, 24, sample_type::MONO)
        .instrument(
            "Piano",
            vec![
                vec![vel_range(0, 63), sample_id(0)],
                vec![vel_range(64, 127), sample_id(1)],
            ],
        )
        .preset("Piano", 0, 0, vec![vec![instrument(0)]])
}

#[test]
fn test_disjoint_velocity_ranges() {
    let sf = two_velocity_layers().soundfont();
    let converter = Converter::default();
    let catalog = converter.catalog(&sf, "test");
    let slot = SlotKey::melodic(0, 0);

    let ranges = catalog.registry.get(&slot).expect("slot should be registered");
    assert_eq!(ranges.len(), 2);
    assert!(ranges.find(0, 63).is_some());
    assert!(ranges.find(64, 127).is_some());

    let resolver = Resolver::new(&sf, &catalog.registry, converter.options());
    let soft = resolver
        .resolve(&Request {
            slot,
            velmin: 0,
            velmax: 63,
            pass: ChannelPass::LeftMono,
        })
        .expect("soft layer should resolve");
    let loud = resolver
        .resolve(&Request {
            slot,
            velmin: 64,
            velmax: 127,
            pass: ChannelPass::LeftMono,
        })
        .expect("loud layer should resolve");
    assert_eq!(soft.len(), 1);
    assert_eq!(loud.len(), 1);
    assert_ne!(soft.layers()[0].sample_index, loud.layers()[0].sample_index);
}

#[test]
fn test_velocity_layers_in_patch() {
    let sf = two_velocity_layers().soundfont();
    let conversion = Converter::default().convert(&sf, "test");
    let patch = patch_of(&conversion, SlotKey::melodic(0, 0));
    assert_eq!(patch.header.layers.len(), 2);
    assert_eq!(patch.header.layers[0].velmin, 0, "widest (first on ties) range is primary");
    assert_eq!(patch.samples.len(), 2);
    assert_eq!(patch.samples[0].data_size, 64);
    assert_eq!(patch.samples[1].data_size, 48);

    assert!(
        conversion.config.contains("\t0 test/Piano\t# 2 velocity ranges\n"),
        "config should note the velocity ranges:\n{}",
        conversion.config
    );
}

#[test]
fn test_small_keeps_primary_layer_only() {
    let mut options = ConvertOptions::new();
    options.small = true;
    let conversion = Converter::new(options).convert(&two_velocity_layers().soundfont(), "test");
    let patch = patch_of(&conversion, SlotKey::melodic(0, 0));
    assert_eq!(patch.header.layers.len(), 1);
    assert_eq!(patch.samples.len(), 1);
}

#[test]
fn test_melody_override_selects_primary() {
    let mut options = ConvertOptions::new();
    options.add_melody_override("0:0=1".parse().unwrap());
    let conversion = Converter::new(options).convert(&two_velocity_layers().soundfont(), "test");
    let patch = patch_of(&conversion, SlotKey::melodic(0, 0));
    assert_eq!(patch.header.layers[0].velmin, 64);
    assert_eq!(patch.samples[0].data_size, 48, "loud sample comes first");
}

#[test]
fn test_resolution_is_repeatable() {
    let sf = two_velocity_layers().soundfont();
    let converter = Converter::default();
    let catalog = converter.catalog(&sf, "test");
    let slot = SlotKey::melodic(0, 0);

    let first = converter.build_patch(&sf, &catalog, slot).unwrap();
    let second = converter.build_patch(&sf, &catalog, slot).unwrap();
    assert_eq!(first, second);

    let resolver = Resolver::new(&sf, &catalog.registry, converter.options());
    let request = Request {
        slot,
        velmin: 0,
        velmax: 63,
        pass: ChannelPass::LeftMono,
    };
    assert_eq!(resolver.resolve(&request).unwrap(), resolver.resolve(&request).unwrap());
}

// =============================================================================
// Stereo
// =============================================================================

fn stereo_strings() -> Sf2Builder {
    Sf2Builder::new()
        .sample("Strings-L", ramp(32), 0, 32, sample_type::MONO)
        .sample("Strings-R", ramp(32), 0, 32, sample_type::MONO)
        .instrument("Strings", vec![vec![sample_id(0)], vec![sample_id(1)]])
        .preset("Strings", 0, 48, vec![vec![instrument(0)]])
}

#[test]
fn test_name_suffix_sets_channel_role() {
    let sf = stereo_strings().soundfont();
    assert_eq!(sf.samples[0].sample_type, sample_type::MONO);
    assert_eq!(sf.samples[0].role(), ChannelRole::Left);
    assert_eq!(sf.samples[1].role(), ChannelRole::Right);

    let catalog = Converter::default().catalog(&sf, "test");
    let range = catalog.registry.get(&SlotKey::melodic(0, 48)).unwrap().ranges()[0];
    assert_eq!((range.left, range.right, range.mono), (1, 1, 0));
}

#[test]
fn test_stereo_patch() {
    let conversion = Converter::default().convert(&stereo_strings().soundfont(), "test");
    let patch = patch_of(&conversion, SlotKey::melodic(0, 48));
    assert_eq!(patch.header.waveforms, 1, "waveform count covers the first pass");
    assert_eq!(patch.header.layers[0].left, 1);
    assert_eq!(patch.header.layers[0].right, 1);
    assert_eq!(patch.samples.len(), 2);
    assert_eq!(patch.samples[0].name_str(), "smp01L");
    assert_eq!(patch.samples[1].name_str(), "smp01R");
    assert!(conversion.config.contains("\t48 test/Strings\t# stereo\n"));
}

#[test]
fn test_mono_drops_right_pass() {
    let mut options = ConvertOptions::new();
    options.mono = true;
    let conversion = Converter::new(options).convert(&stereo_strings().soundfont(), "test");
    let patch = patch_of(&conversion, SlotKey::melodic(0, 48));
    assert_eq!(patch.header.layers[0].right, 0);
    assert_eq!(patch.samples.len(), 1);
    assert_eq!(patch.samples[0].name_str(), "smp01L");
}

// =============================================================================
// Generators
// =============================================================================

#[test]
fn test_preset_generators_add_to_instrument() {
    let builder = Sf2Builder::new()
        .sample("Tone", ramp(32), 0, 32, sample_type::MONO)
        .instrument(
            "Tone",
            vec![
                vec![Generator::new(oper::PAN, 100)],
                vec![Generator::new(oper::PAN, 200), sample_id(0)],
            ],
        )
        .preset(
            "Tone",
            0,
            0,
            vec![
                vec![Generator::new(oper::PAN, 50)],
                vec![Generator::new(oper::PAN, 50), instrument(0)],
            ],
        );
    let conversion = Converter::default().convert(&builder.soundfont(), "test");
    let sample = &patch_of(&conversion, SlotKey::melodic(0, 0)).samples[0];
    // 200 local instrument, plus 50 + 50 from the preset zones
    assert_eq!(sample.pan, (300 * 256 / 1000 + 127) as u8);
}

#[test]
fn test_global_instrument_zone_applies_without_local() {
    let builder = Sf2Builder::new()
        .sample("Tone", ramp(32), 0, 32, sample_type::MONO)
        .instrument(
            "Tone",
            vec![vec![Generator::new(oper::PAN, -300)], vec![sample_id(0)]],
        )
        .preset("Tone", 0, 0, vec![vec![instrument(0)]]);
    let conversion = Converter::default().convert(&builder.soundfont(), "test");
    let sample = &patch_of(&conversion, SlotKey::melodic(0, 0)).samples[0];
    assert_eq!(sample.pan, (-300 * 256 / 1000 + 127) as u8);
}

#[test]
fn test_preset_key_range_narrows() {
    let builder = Sf2Builder::new()
        .sample("Tone", ramp(32), 0, 32, sample_type::MONO)
        .instrument("Wide", vec![vec![key_range(0, 127), sample_id(0)]])
        .instrument("Narrow", vec![vec![key_range(50, 70), sample_id(0)]])
        .preset("Inside", 0, 0, vec![vec![key_range(40, 60), instrument(0)]])
        .preset("Outside", 0, 1, vec![vec![key_range(30, 90), instrument(1)]]);
    let sf = builder.soundfont();

    let mut zones = Vec::new();
    walk_preset(&sf, 0, |zone| zones.push((zone.keymin, zone.keymax)));
    assert_eq!(zones, vec![(40, 60)], "preset range inside the instrument range wins");

    let mut zones = Vec::new();
    walk_preset(&sf, 1, |zone| zones.push((zone.keymin, zone.keymax)));
    assert_eq!(zones, vec![(50, 70)], "instrument range kept otherwise");
}

// =============================================================================
// Layer capacity
// =============================================================================

fn many_layers(count: usize) -> Sf2Builder {
    let zones = (0..count).map(|_| vec![vel_range(0, 127), sample_id(0)]).collect();
    Sf2Builder::new()
        .sample("Tone", ramp(8), 0, 8, sample_type::MONO)
        .instrument("Stack", zones)
        .preset("Stack", 0, 0, vec![vec![instrument(0)]])
}

#[test]
fn test_full_waiting_list() {
    let sf = many_layers(256).soundfont();
    let converter = Converter::default();
    let catalog = converter.catalog(&sf, "test");
    let resolver = Resolver::new(&sf, &catalog.registry, converter.options());
    let list = resolver
        .resolve(&Request {
            slot: SlotKey::melodic(0, 0),
            velmin: 0,
            velmax: 127,
            pass: ChannelPass::LeftMono,
        })
        .expect("256 layers should fit");
    assert_eq!(list.len(), 256);
    assert_eq!(list.dropped(), 0);
}

#[test]
fn test_overfull_waiting_list_truncates() {
    let sf = many_layers(257).soundfont();
    let converter = Converter::default();
    let catalog = converter.catalog(&sf, "test");
    let resolver = Resolver::new(&sf, &catalog.registry, converter.options());
    let list = resolver.collect(&Request {
        slot: SlotKey::melodic(0, 0),
        velmin: 0,
        velmax: 127,
        pass: ChannelPass::LeftMono,
    });
    assert_eq!(list.len(), 256);
    assert_eq!(list.dropped(), 1);

    // The truncated list no longer matches the catalog, so only this slot fails
    let conversion = converter.convert(&sf, "test");
    assert_eq!(conversion.failures.len(), 1);
}

// =============================================================================
// Drums
// =============================================================================

fn drum_kit() -> Sf2Builder {
    Sf2Builder::new()
        .sample("Kick", ramp(16), 0, 16, sample_type::MONO)
        .sample("Snare", ramp(20), 0, 20, sample_type::MONO)
        .instrument(
            "Kit",
            vec![
                vec![key_range(36, 36), sample_id(0)],
                vec![key_range(38, 38), sample_id(1)],
            ],
        )
        .preset("Standard", 128, 0, vec![vec![instrument(0)]])
}

#[test]
fn test_drum_kit() {
    let (dir, conversion) = convert_in_tempdir(&drum_kit(), ConvertOptions::new());
    assert!(out_path(&dir, "test-Standard/Kick.pat").exists());
    assert!(out_path(&dir, "test-Standard/Snare.pat").exists());

    let kick = read_patch(&out_path(&dir, "test-Standard/Kick.pat"));
    assert_eq!(kick.samples.len(), 1);
    assert_eq!(kick.samples[0].data_size, 32);

    let expected = "\ndrumset 0 #N Standard\n\t36 test-Standard/Kick\n\t38 test-Standard/Snare\n";
    assert!(
        conversion.config.ends_with(expected),
        "unexpected config:\n{}",
        conversion.config
    );
}

#[test]
fn test_force_drum() {
    let builder = Sf2Builder::new()
        .sample("Clap", ramp(16), 0, 16, sample_type::MONO)
        .instrument("Claps", vec![vec![key_range(39, 39), sample_id(0)]])
        .preset("Claps", 0, 5, vec![vec![instrument(0)]]);
    let mut options = ConvertOptions::new();
    options.force_drum = true;
    let conversion = Converter::new(options).convert(&builder.soundfont(), "test");

    assert!(conversion.catalog.tonebanks.is_empty());
    assert!(conversion.catalog.drumsets.contains_key(&5));
    let patch = patch_of(&conversion, SlotKey::drum(5, 39));
    assert_eq!(patch.samples.len(), 1);
}

// =============================================================================
// Files and failures
// =============================================================================

#[test]
fn test_config_text() {
    let builder = single_preset("Piano", vec![vec![sample_id(0)]]);
    let (dir, conversion) = convert_in_tempdir(&builder, ConvertOptions::new());
    let text = std::fs::read_to_string(out_path(&dir, "test.cfg")).unwrap();
    assert_eq!(text, conversion.config);
    assert_eq!(
        text,
        "# Bank name:  Test Font\n# Made by:    Tester\n\nbank 0 #N test\n\t0 test/Piano\n"
    );
}

#[test]
fn test_bad_sample_fails_only_its_slot() {
    let builder = Sf2Builder::new()
        .sample("Good", ramp(32), 0, 32, sample_type::MONO)
        .sample("Bad", ramp(32), 0, 32, sample_type::MONO)
        .instrument("Good", vec![vec![sample_id(0)]])
        .instrument(
            "Bad",
            vec![vec![Generator::new(oper::END_ADDRS_OFFSET, -40), sample_id(1)]],
        )
        .preset("Good", 0, 0, vec![vec![instrument(0)]])
        .preset("Bad", 0, 1, vec![vec![instrument(1)]]);
    let (dir, conversion) = convert_in_tempdir(&builder, ConvertOptions::new());

    assert!(out_path(&dir, "test/Good.pat").exists());
    assert!(!out_path(&dir, "test/Bad.pat").exists());
    assert_eq!(conversion.failures.len(), 1);
    assert_eq!(conversion.failures[0].0, SlotKey::melodic(0, 1));
    assert!(conversion.failures[0].1.contains("negative length"));
    assert!(conversion.catalog.registry.get(&SlotKey::melodic(0, 1)).is_none());
    assert!(conversion.config.contains("\t# 1 Bad could not be extracted\n"));
}

#[test]
fn test_no_write() {
    let builder = single_preset("Piano", vec![vec![sample_id(0)]]);
    let mut options = ConvertOptions::new();
    options.no_write = true;
    let (dir, conversion) = convert_in_tempdir(&builder, options);
    assert_eq!(conversion.patches.len(), 1);
    assert!(!dir.path().join("out").exists(), "nothing should be written");
}

#[test]
fn test_gzipped_input() {
    let builder = single_preset("Piano", vec![vec![sample_id(0)]]);
    let dir = tempdir().unwrap();
    let input = dir.path().join("zipped font.sf2.gz");
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&builder.build()).unwrap();
    std::fs::write(&input, encoder.finish().unwrap()).unwrap();

    let sf = unsf::sf2::load(&input).expect("gzipped bank should load");
    assert_eq!(sf.real_presets().len(), 1);

    let conversion = Converter::default()
        .convert_file(&input, &dir.path().join("out"))
        .expect("Conversion failed");
    assert_eq!(conversion.catalog.basename, "zipped_font.sf2");
    assert!(dir.path().join("out/zipped_font.sf2/Piano.pat").exists());
}

#[test]
fn test_truncated_file_rejected() {
    let data = single_preset("Piano", vec![vec![sample_id(0)]]).build();
    let err = unsf::sf2::parse(&data[..40]).unwrap_err();
    assert!(
        matches!(err, Error::BadStructure(_) | Error::UnexpectedEof),
        "unexpected error: {}",
        err
    );
}

#[test]
fn test_patch_json() {
    let builder = single_preset("Piano", vec![vec![sample_id(0)]]);
    let conversion = Converter::default().convert(&builder.soundfont(), "test");
    let patch = patch_of(&conversion, SlotKey::melodic(0, 0));
    let json = serde_json::to_value(PatchJson::new(&patch)).unwrap();
    assert_eq!(json["instrument"], "Piano");
    assert_eq!(json["waveforms"], 1);
    assert_eq!(json["samples"][0]["name"], "smp01M");
    assert_eq!(json["samples"][0]["bits"], 16);
}
