use clap::Parser;
use std::path::PathBuf;

/// User-specified command line parameters
#[derive(Debug, Parser)]
#[clap(name = "moddingtool", about)]
pub struct Args {
    /// Path to the script to run.
    pub script_path: PathBuf,
}
