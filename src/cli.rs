//! CLI glue: enough `clap`-derive surface to drive an engine run end-to-end
//! from a project file. The richer multi-command CLI a production tool would
//! have is out of scope — this exists to exercise the engine, not to be one.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "taskforge")]
#[command(about = "Runs a project's task graph")]
#[command(version)]
pub struct Cli {
    /// One or more execution or pipeline names to run. Their transitive
    /// dependencies run too.
    #[arg(required = true)]
    pub targets: Vec<String>,

    /// Path to a config file overriding the baked-in defaults.
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Emit compact human-readable logs instead of JSON.
    #[arg(long = "pretty")]
    pub pretty: bool,
}
