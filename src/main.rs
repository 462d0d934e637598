//! padlink - compile, run and hot reload DartPad programs from the terminal
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;

use padlink::HeadlessOptions;

/// padlink - compile, run and hot reload DartPad programs
#[derive(Parser, Debug)]
#[command(name = "padlink")]
#[command(about = "Compile, run and hot reload DartPad programs", long_about = None)]
struct Args {
    /// Dart source file to compile and watch
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Service release channel (local, main or a channel name)
    #[arg(long)]
    channel: Option<String>,

    /// Explicit service host URL; overrides --channel
    #[arg(long)]
    host: Option<String>,

    /// Directory that receives the delivered scripts
    #[arg(long, value_name = "DIR", default_value = ".padlink/out")]
    out: PathBuf,

    /// Do not watch the source file for changes
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    if let Err(e) = padlink_core::logging::init() {
        eprintln!("Warning: failed to initialize logging: {}", e);
    }

    padlink::run_headless(HeadlessOptions {
        source_path: args.file,
        channel: args.channel,
        host: args.host,
        out_dir: args.out,
        watch: !args.no_watch,
    })
    .await?;

    Ok(())
}
