use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::info;

use instr_core::instrument::Instrument;
use instr_core::mcrun::{McrunExecutor, DEFAULT_EXECUTABLE};
use instr_core::run::InstrumentRunner;
use instr_core::synthetic::{demo_instrument, SyntheticRunner};

use instr_ui::app::InstrUiApp;
use instr_ui::interface::SimInterface;
use instr_ui::settings::settings_file_path;
use instr_ui::ui::app_shell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RunnerKind {
    Synthetic,
    Mcrun,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Desktop interface for instrument simulation runs")]
struct Args {
    /// Instrument descriptor (JSON). Without it the built-in synthetic source is used.
    instrument: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "synthetic")]
    runner: RunnerKind,

    /// Simulation executable for the mcrun runner.
    #[arg(long, default_value = DEFAULT_EXECUTABLE)]
    mcrun: PathBuf,

    /// Directory holding the run output folders.
    #[arg(long, default_value = ".")]
    output_root: PathBuf,

    #[arg(long)]
    foldername: Option<String>,

    /// Do not read or write the settings file.
    #[arg(long)]
    no_settings: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let instrument = match &args.instrument {
        Some(path) => Instrument::from_json_file(path)?,
        None => demo_instrument(),
    };
    let runner: Box<dyn InstrumentRunner> = match args.runner {
        RunnerKind::Synthetic => Box::new(SyntheticRunner::new()),
        RunnerKind::Mcrun => Box::new(McrunExecutor::new(&args.mcrun, &args.output_root)),
    };
    info!(
        "Opening {} with the {:?} runner",
        instrument.name, args.runner
    );

    let settings_path = if args.no_settings {
        None
    } else {
        Some(settings_file_path()?)
    };
    let mut app = InstrUiApp::new(SimInterface::new(instrument, runner), settings_path);
    app.set_instrument_path(args.instrument.clone());
    if let Some(foldername) = args.foldername {
        app.interface.set_foldername(foldername);
    }

    app_shell::run(app)?;
    Ok(())
}
