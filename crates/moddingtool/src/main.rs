mod cli;

use clap::Parser;
use log::*;
use std::process::ExitCode;

fn main() -> ExitCode {
    pretty_env_logger::formatted_builder()
        .format_indent(None)
        .format_timestamp(None)
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = cli::Args::parse();

    match mt_script::run_file(&args.script_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            println!("{err}");
            ExitCode::FAILURE
        }
    }
}
