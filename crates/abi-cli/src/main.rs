use std::path::PathBuf;

use abi_cli::report;
use abi_config::{init_tracing, AbiCheckConfig};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "abi-check",
    version,
    about = "Find binary incompatibilities between JVM libraries on a runtime classpath"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check the classpath described by a config file (exit code 1 when conflicts are found)
    Check(CheckArgs),
}

#[derive(Args)]
struct CheckArgs {
    /// Path to `abi-check.toml`
    #[arg(long, default_value = "abi-check.toml")]
    config: PathBuf,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
    /// Check every class on the classpath, not only those reachable from the entry points
    #[arg(long)]
    complete: bool,
    /// Runtime feature version used to select multi-release jar entries
    #[arg(long)]
    release: Option<u32>,
    /// Leave the JDK's platform modules off the classpath
    #[arg(long)]
    no_jdk: bool,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Check(args) => {
            let mut config = AbiCheckConfig::load_from_path(&args.config)
                .with_context(|| format!("failed to load {}", args.config.display()))?;
            if args.complete {
                config.checker.check_completely = true;
            }
            if args.release.is_some() {
                config.classpath.release = args.release;
            }
            if args.no_jdk {
                config.classpath.include_jdk = false;
            }
            init_tracing(&config.logging);

            let conflicts = abi_cli::check_config(&config)?;
            if args.json {
                println!("{}", report::render_json(&conflicts)?);
            } else {
                print!("{}", report::render_text(&conflicts)?);
            }
            Ok(if conflicts.is_empty() { 0 } else { 1 })
        }
    }
}
