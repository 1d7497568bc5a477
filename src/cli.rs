use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding the plate map, measurement sheets and baselines
    /// (overrides the config file)
    #[arg(short, long)]
    pub input_dir: Option<PathBuf>,

    /// Directory the per-sample reports are written to (overrides the config file)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Discard scans whose plate/well has no declared sample instead of failing
    #[arg(short, long)]
    pub tolerant: bool,

    /// Write measured values without background subtraction
    #[arg(long)]
    pub raw: bool,
}
