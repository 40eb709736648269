//! Patch-config text for the generated bank

use super::catalog::Catalog;
use super::velocity::SlotKey;
use crate::sf2::InfoEntry;
use std::fmt::Write;

/// Render the config file: INFO comments, then every tonebank and drumset
/// with one line per slot
pub fn render(info: &[InfoEntry], catalog: &Catalog) -> String {
    let mut out = String::new();
    for entry in info {
        let _ = writeln!(out, "# {:<12}{}", entry.title, entry.text);
    }

    for (&bank, dir) in &catalog.tonebanks {
        let _ = write!(out, "\nbank {} #N {}\n", bank, dir);
        for (slot, name) in catalog.names.range(SlotKey::melodic(bank, 0)..=SlotKey::melodic(bank, 127)) {
            write_slot(&mut out, catalog, slot, dir, name);
        }
    }

    for (&drumset, kit) in &catalog.drumsets {
        let _ = write!(out, "\ndrumset {} #N {}\n", drumset, kit.short_name);
        for (slot, name) in catalog.names.range(SlotKey::drum(drumset, 0)..=SlotKey::drum(drumset, 127)) {
            write_slot(&mut out, catalog, slot, &kit.dir, name);
        }
    }
    out
}

fn write_slot(out: &mut String, catalog: &Catalog, slot: &SlotKey, dir: &str, name: &str) {
    let Some(ranges) = catalog.registry.get(slot) else {
        let _ = writeln!(out, "\t# {} {} could not be extracted", slot.program, name);
        return;
    };
    let _ = write!(out, "\t{} {}/{}", slot.program, dir, name);
    let count = ranges.len();
    if count > 1 {
        let _ = write!(out, "\t# {} velocity ranges", count);
    }
    if ranges.primary().map(|r| r.right > 0).unwrap_or(false) {
        out.push_str(if count == 1 { "\t# stereo" } else { ", stereo" });
    }
    out.push('\n');
}
