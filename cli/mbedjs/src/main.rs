//! mbedjs: build JavaScript programs into mbed firmware.

mod commands;
mod logging;
mod manifest;

use std::process;

use clap::{ArgAction, Args, Parser, Subcommand};

use manifest::load_project;

#[derive(Parser)]
#[command(name = "mbedjs", version, about = "Build JavaScript programs into mbed firmware")]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TargetArgs {
    /// Target board (e.g., K64F, NUCLEO_F401RE)
    #[arg(long, env = "MBEDJS_TARGET")]
    target: Option<String>,
    /// Board variant used to pick among pin tables sharing an MCU
    #[arg(long, env = "MBEDJS_VARIANT")]
    variant: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Bundle, generate sources and compile firmware
    Build {
        #[command(flatten)]
        target: TargetArgs,
        /// Print the stage plan and exit
        #[arg(long)]
        plan: bool,
    },
    /// Bundle and minify the program only
    Bundle,
    /// Show the pin constants for a target
    Pins {
        #[command(flatten)]
        target: TargetArgs,
    },
    /// List native libraries provided by dependencies
    Libs,
    /// Remove the build directory
    Clean,
    /// Add mbedjs settings to the current directory
    Init {
        /// Default target board written to mbedjs.toml
        #[arg(long, default_value = "K64F")]
        target: String,
    },
    /// Check toolchain and project status
    Doctor,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose, cli.quiet) {
        eprintln!("warning: logging unavailable: {e:#}");
    }

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Build { target, plan } => {
            let (manifest, project_dir, settings) = load_project(&cwd)?;
            commands::build::run(
                &project_dir,
                &manifest,
                &settings,
                target.target.as_deref(),
                target.variant.as_deref(),
                plan,
            )
        }

        Commands::Bundle => {
            let (manifest, project_dir, settings) = load_project(&cwd)?;
            commands::bundle::run(&project_dir, &manifest, &settings)
        }

        Commands::Pins { target } => {
            let (_, project_dir, settings) = load_project(&cwd)?;
            commands::pins::run(
                &project_dir,
                &settings,
                target.target.as_deref(),
                target.variant.as_deref(),
            )
        }

        Commands::Libs => {
            let (manifest, project_dir, settings) = load_project(&cwd)?;
            commands::libs::run(&project_dir, &manifest, &settings)
        }

        Commands::Clean => {
            let (_, project_dir, settings) = load_project(&cwd)?;
            commands::clean::run(&project_dir, &settings)
        }

        Commands::Init { target } => commands::init::run(&cwd, &target),

        Commands::Doctor => commands::doctor::run(&cwd),
    }
}
