//! GUS patch to JSON dumper

use clap::Parser;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use unsf::patch::{PatchJson, PatchReader};

#[derive(Parser, Debug)]
#[command(name = "pat2json")]
#[command(version = "0.1.0")]
#[command(about = "Dump GUS .pat files as JSON", long_about = None)]
struct Args {
    /// Input patch file
    input: PathBuf,

    /// Output JSON file (writes to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output compact JSON (default is pretty-printed)
    #[arg(short, long)]
    compact: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let data = fs::read(&args.input)?;
    let patch = PatchReader::new(&data).parse()?;
    let patch_json = PatchJson::new(&patch);

    let json_string = if args.compact {
        serde_json::to_string(&patch_json)?
    } else {
        serde_json::to_string_pretty(&patch_json)?
    };

    match args.output {
        Some(path) => {
            let mut file = File::create(path)?;
            file.write_all(json_string.as_bytes())?;
            file.write_all(b"\n")?;
        }
        None => {
            println!("{}", json_string);
        }
    }

    Ok(())
}
