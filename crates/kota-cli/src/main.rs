use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use kota_cli::commands::{self, ota::OtaCheckOptions, publish::PublishOptions, Cli, Commands, OtaCommands};
use kota_cli::errors::{classify_exit_code, failure_report};
use kota_cli::logging::init_logging;
use std::process;
use std::time::Instant;
use tracing::{info, info_span, Instrument};

const LOG_TAIL: usize = 10;

#[tokio::main]
async fn main() -> Result<()> {
    let start = Instant::now();
    let cli = match Cli::try_parse() {
        Ok(c) => c,
        Err(e) => {
            let _ = e.print();
            process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };
    init_logging(&cli.log_level, &cli.log_format)?;
    let exit_code = match dispatch(cli).await {
        Ok(()) => 0,
        Err(e) => {
            let mut lines = failure_report(&e, LOG_TAIL).into_iter();
            if let Some(head) = lines.next() { eprintln!("{}", head.red()); }
            for line in lines { eprintln!("{}", line.dimmed()); }
            classify_exit_code(&e)
        }
    };
    info!(took_ms=%start.elapsed().as_millis(), event="cli.finished", exit_code=exit_code);
    if exit_code != 0 { process::exit(exit_code); }
    Ok(())
}

async fn dispatch(cli: Cli) -> Result<()> {
    let start = Instant::now();
    let result = match cli.command {
        Commands::Publish { platform, flavor, config, dry_run, format } => {
            let span = info_span!("cmd.publish", %platform, ?flavor, dry_run);
            commands::publish::handle(PublishOptions { platform, flavor, config, dry_run, format }).instrument(span).await
        }
        Commands::Ota { command } => match command {
            OtaCommands::Check { platform, version, version_code, worker_url, bundle_dir, format } => {
                let span = info_span!("cmd.ota.check", %platform);
                commands::ota::check(OtaCheckOptions { platform, version, version_code, worker_url, bundle_dir, format }).instrument(span).await
            }
            OtaCommands::BundlePath { bundle_dir } => { let _span = info_span!("cmd.ota.bundle_path").entered(); commands::ota::bundle_path(bundle_dir) }
            OtaCommands::Clear { bundle_dir } => { let _span = info_span!("cmd.ota.clear").entered(); commands::ota::clear(bundle_dir) }
        },
    };
    let took = start.elapsed().as_millis();
    match &result { Ok(_) => info!(event="cmd.finished", took_ms=%took), Err(_) => info!(event="cmd.failed", took_ms=%took) }
    result
}
