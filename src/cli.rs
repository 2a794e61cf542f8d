use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "introseek",
    about = "Find where an audio snippet occurs in a media file using chromagram correlation"
)]
pub struct Cli {
    /// Target media file to scan
    pub target: PathBuf,

    /// Reference audio snippet (the intro/outro)
    pub reference: PathBuf,

    /// Correlation threshold 0-1 for accepting a match
    #[arg(long, default_value_t = 0.8)]
    pub threshold: f32,

    /// Outro length in seconds recorded with the result (0 = disabled)
    #[arg(long, default_value_t = 0.0)]
    pub outro_length: f64,

    /// Results file (JSON lines)
    #[arg(short, long, default_value = "intro_timestamps.jsonl")]
    pub results: PathBuf,

    /// Config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Rescan even when the target is already in the results file
    #[arg(long)]
    pub force: bool,
}
