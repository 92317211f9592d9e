use std::path::PathBuf;

use clap::Parser;

/// Runs a particle simulation described by a RON run file.
#[derive(Parser, Debug, Clone)]
#[command(name = "stride-run", version)]
pub struct EngineConfig {
    #[arg(skip = String::from("Stride"))]
    pub app_name: String,
    /// Run file to load.
    #[arg(default_value = "scenarios/ellipsoid.ron")]
    pub run_file: PathBuf,
    /// Steps between progress reports. Zero disables them.
    #[arg(long, default_value_t = 100)]
    pub report_every: u64,
    /// Where to write the final configuration snapshot, if anywhere.
    #[arg(long, value_name = "PATH")]
    pub checkpoint: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::parse_from(["stride-run"])
    }
}
