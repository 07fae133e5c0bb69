//! calldock - a floating voice/video calling widget for the terminal
//!
//! This is the binary entry point. All logic lives in the workspace crates.

use std::path::PathBuf;

use clap::Parser;

use calldock_tui::RunOptions;

/// A floating voice/video calling widget for terminal applications
#[derive(Parser, Debug)]
#[command(name = "calldock")]
#[command(about = "A floating voice/video calling widget", long_about = None)]
struct Args {
    /// Application id registered with the calling service
    #[arg(long, value_name = "ID")]
    app_id: Option<String>,

    /// Local user identity for the signaling connection
    #[arg(long, value_name = "USER")]
    user_id: Option<String>,

    /// Signaling endpoint, e.g. wss://calls.example.com/signal
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,

    /// Run against an in-process demo switchboard (no service needed)
    #[arg(long)]
    demo: bool,

    /// Name of the auto-answering demo peer
    #[arg(long, value_name = "USER", requires = "demo")]
    demo_peer: Option<String>,

    /// Project directory whose .calldock/ holds the config
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,

    /// Write logs to this directory instead of the default
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    calldock_core::logging::init(args.log_dir.as_deref())?;

    calldock_tui::run(RunOptions {
        app_id: args.app_id,
        user_id: args.user_id,
        endpoint: args.endpoint,
        demo: args.demo,
        demo_peer: args.demo_peer,
        project_dir: args.path,
    })
    .await?;

    Ok(())
}
