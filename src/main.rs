use clap::{ArgAction, Parser};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use unsf::convert::VelocityOverride;
use unsf::{ConvertOptions, Converter};

#[derive(Parser, Debug)]
#[command(name = "unsf")]
#[command(version = "0.1.0")]
#[command(about = "SoundFont 2 to GUS patch converter", long_about = None)]
#[command(disable_version_flag = true)]
struct Args {
    /// Input SoundFont (.sf2, optionally gzipped)
    input: PathBuf,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, action = ArgAction::Count)]
    verbose: u8,

    /// Resolve everything but write no files
    #[arg(short = 'n', long)]
    no_write: bool,

    /// Only write the primary velocity layer of each patch
    #[arg(short, long)]
    small: bool,

    /// Treat every preset as a drum kit
    #[arg(short, long)]
    drum: bool,

    /// Leave out right-channel samples
    #[arg(short, long)]
    mono: bool,

    /// Derive sample looping from General MIDI program categories
    #[arg(short = 'F', long)]
    adjust_sample_flags: bool,

    /// Do not derive the sample volume from the waveform peak
    #[arg(short = 'V', long)]
    no_volume_adjust: bool,

    /// Write 8-bit waveforms
    #[arg(short = '8', long = "8bit")]
    eight_bit: bool,

    /// Output directory
    #[arg(short = 'O', long, default_value = ".")]
    output_dir: PathBuf,

    /// Primary velocity layer for a melodic patch (bank:program=layer)
    #[arg(short = 'M', value_name = "BANK:PROG=LAYER")]
    melody: Vec<VelocityOverride>,

    /// Primary velocity layer for a drum (drumset:key=layer)
    #[arg(short = 'D', value_name = "DRUMSET:KEY=LAYER")]
    drum_layer: Vec<VelocityOverride>,

    /// Print version
    #[arg(long, action = ArgAction::Version)]
    version: Option<bool>,
}

impl Args {
    fn options(&self) -> ConvertOptions {
        let mut options = ConvertOptions::new();
        options.eight_bit = self.eight_bit;
        options.mono = self.mono;
        options.small = self.small;
        options.force_drum = self.drum;
        options.adjust_sample_flags = self.adjust_sample_flags;
        options.adjust_volume = !self.no_volume_adjust;
        options.no_write = self.no_write;
        for &o in &self.melody {
            options.add_melody_override(o);
        }
        for &o in &self.drum_layer {
            options.add_drum_override(o);
        }
        options
    }
}

fn main() -> Result<(), unsf::Error> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    let converter = Converter::new(args.options());
    let conversion = converter.convert_file(&args.input, &args.output_dir)?;

    if !conversion.failures.is_empty() {
        eprintln!(
            "{} of {} patches could not be extracted",
            conversion.failures.len(),
            conversion.catalog.names.len()
        );
    }

    Ok(())
}
