use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use instr_core::dataset::{Dataset, MonitorValues};
use instr_core::events::Axis;
use instr_core::export::{write_events_parquet, write_histogram_csv};
use instr_core::histogram::{histogram, Histogram};
use instr_core::instrument::{Instrument, ParameterMap, ParameterType, ParameterValue};
use instr_core::mcrun::{McrunExecutor, DEFAULT_EXECUTABLE};
use instr_core::run::{
    parse_ncount, InstrumentRunner, MpiSetting, RunRequest, DEFAULT_FOLDER_NAME,
    DEFAULT_MPI_TEXT, DEFAULT_NCOUNT_TEXT,
};
use instr_core::synthetic::SyntheticRunner;
use instr_core::view::{Bins, View};

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "instr_cli",
    about = "Describe and run instruments without the desktop interface"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the parameter table of an instrument descriptor
    Describe {
        instrument: PathBuf,
    },
    /// Run an instrument and summarise its monitors
    Run(RunArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RunnerKind {
    Synthetic,
    Mcrun,
}

#[derive(clap::Args)]
struct RunArgs {
    instrument: PathBuf,
    #[arg(long, value_enum, default_value_t = RunnerKind::Synthetic)]
    runner: RunnerKind,
    /// Simulation executable for the mcrun runner
    #[arg(long, env = "INSTR_MCRUN", default_value = DEFAULT_EXECUTABLE)]
    mcrun: PathBuf,
    #[arg(long, default_value = ".")]
    output_root: PathBuf,
    #[arg(long, default_value = DEFAULT_FOLDER_NAME)]
    foldername: String,
    /// Fail instead of picking `<name>_0`, `<name>_1`, … when the folder exists
    #[arg(long)]
    no_increment: bool,
    #[arg(long, default_value = DEFAULT_NCOUNT_TEXT)]
    ncount: String,
    /// Process count, or "disabled"
    #[arg(long, default_value = DEFAULT_MPI_TEXT)]
    mpi: String,
    /// Parameter value, repeatable
    #[arg(long = "set", value_name = "NAME=VALUE")]
    set: Vec<String>,
    /// Histogram the event monitor on one axis or two (`l` or `x,y`)
    #[arg(long, value_name = "AXIS[,AXIS]")]
    view: Option<String>,
    #[arg(long, value_name = "N[,M]")]
    bins: Option<String>,
    #[arg(long, value_name = "A:B", allow_hyphen_values = true)]
    limits1: Option<String>,
    #[arg(long, value_name = "A:B", allow_hyphen_values = true)]
    limits2: Option<String>,
    /// Write the view histogram as CSV
    #[arg(long)]
    histogram_csv: Option<PathBuf>,
    /// Write the event monitor as Parquet
    #[arg(long)]
    events_parquet: Option<PathBuf>,
}

// ── helpers ────────────────────────────────────────────────────────

fn parse_assignment(text: &str) -> Result<(String, String), String> {
    match text.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{text}'")),
    }
}

fn parse_limits(text: &str) -> Result<(f64, f64), String> {
    let (start, end) = text
        .split_once(':')
        .ok_or_else(|| format!("expected START:END, got '{text}'"))?;
    let parse = |value: &str| {
        value
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("'{value}' is not a number"))
    };
    Ok((parse(start)?, parse(end)?))
}

/// Upper bound on bins per axis.
const MAX_BINS: usize = 10_000;

fn parse_bins(text: &str) -> Result<Bins, String> {
    let parse = |value: &str| {
        let bins = value
            .trim()
            .parse::<usize>()
            .map_err(|_| format!("'{value}' is not a bin count"))?;
        if bins > MAX_BINS {
            return Err(format!("{bins} bins is more than the limit of {MAX_BINS}"));
        }
        Ok(bins)
    };
    match text.split_once(',') {
        Some((first, second)) => Ok(Bins::Pair(parse(first)?, parse(second)?)),
        None => Ok(Bins::Single(parse(text)?)),
    }
}

fn build_view(args: &RunArgs) -> Result<Option<View>, Box<dyn Error>> {
    let Some(axes_text) = args.view.as_deref() else {
        return Ok(None);
    };
    let mut axes = axes_text.split(',').map(|axis| axis.trim().parse::<Axis>());
    let axis1 = axes.next().ok_or("empty --view")??;
    let axis2 = axes.next().transpose()?;
    if axes.next().is_some() {
        return Err(format!("--view takes at most two axes, got '{axes_text}'").into());
    }

    let mut view = View::new(axis1);
    if let Some(axis2) = axis2 {
        view = view.with_axis2(axis2);
    }
    if let Some(bins) = args.bins.as_deref() {
        view = view.with_bins(parse_bins(bins)?);
    }
    if let Some(limits) = args.limits1.as_deref() {
        let (start, end) = parse_limits(limits)?;
        view.set_axis1_limits(start, end)?;
    }
    if let Some(limits) = args.limits2.as_deref() {
        let (start, end) = parse_limits(limits)?;
        view.set_axis2_limits(start, end)?;
    }
    Ok(Some(view))
}

fn build_request(args: &RunArgs) -> Result<RunRequest, Box<dyn Error>> {
    let ncount = parse_ncount(&args.ncount)?;
    let mpi: MpiSetting = args.mpi.parse()?;
    let mut parameters = ParameterMap::new();
    for assignment in &args.set {
        let (name, value) = parse_assignment(assignment)?;
        parameters.insert(name, ParameterValue::Text(value));
    }
    Ok(RunRequest::new(parameters, ncount)
        .with_mpi(mpi)
        .with_foldername(args.foldername.clone())
        .with_increment_folder_name(!args.no_increment))
}

fn type_name(kind: ParameterType) -> &'static str {
    match kind {
        ParameterType::Double => "double",
        ParameterType::Int => "int",
        ParameterType::String => "string",
    }
}

fn summarise(data: &Dataset) {
    for monitor in &data.monitors {
        let detail = match &monitor.values {
            MonitorValues::OneD { x, .. } => format!("{} points", x.len()),
            MonitorValues::TwoD { nx, ny, .. } => format!("{nx} x {ny}"),
            MonitorValues::Events(events) => format!("{} rays", events.len()),
        };
        println!(
            "{:<20} {:<8} {:<14} I = {:.6e}",
            monitor.name,
            monitor.kind(),
            detail,
            monitor.total_intensity()
        );
    }
}

// ── commands ───────────────────────────────────────────────────────

fn describe(path: &Path) -> Result<(), Box<dyn Error>> {
    let instrument = Instrument::from_json_file(path)?;
    println!("{}", instrument.name);
    if let Some(source) = &instrument.source {
        println!("source: {}", source.display());
    }
    println!("{:<20} {:<8} {:<12} comment", "parameter", "type", "default");
    for parameter in &instrument.parameter_list {
        let default = parameter
            .default_value()
            .map(|value| value.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<20} {:<8} {:<12} {}",
            parameter.name,
            type_name(parameter.kind),
            default,
            parameter.comment
        );
    }
    Ok(())
}

fn run(args: RunArgs) -> Result<(), Box<dyn Error>> {
    let instrument = Instrument::from_json_file(&args.instrument)?;
    let mut request = build_request(&args)?;
    for (name, value) in instrument.default_parameters() {
        request.parameters.entry(name).or_insert(value);
    }
    let view = build_view(&args)?;

    let runner: Box<dyn InstrumentRunner> = match args.runner {
        RunnerKind::Synthetic => Box::new(SyntheticRunner::new()),
        RunnerKind::Mcrun => Box::new(McrunExecutor::new(&args.mcrun, &args.output_root)),
    };
    info!("Running {} with {request}", instrument.name);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    spinner.set_message(format!("running {} ({} rays)", instrument.name, request.ncount));
    spinner.enable_steady_tick(Duration::from_millis(100));
    let result = runner.run_full_instrument(&instrument, &request);
    spinner.finish_and_clear();
    let data = result?;

    summarise(&data);

    let events = data.event_monitors().next().map(|(_, events)| events);
    if let Some(path) = &args.events_parquet {
        let events = events.ok_or("run produced no event monitor to export")?;
        write_events_parquet(path, events)?;
        println!("events written to {}", path.display());
    }
    if let Some(view) = view {
        let events = events.ok_or("run produced no event monitor to histogram")?;
        let hist = histogram(events, &view)?;
        match &hist {
            Histogram::OneD(h) => println!(
                "view {}: {} bins over [{}, {}]",
                h.binning.axis, h.binning.bins, h.binning.start, h.binning.end
            ),
            Histogram::TwoD(h) => println!(
                "view {},{}: {} x {} bins",
                h.x.axis, h.y.axis, h.x.bins, h.y.bins
            ),
        }
        println!(
            "  intensity {:.6e}, {} events",
            hist.total_intensity(),
            hist.total_events()
        );
        if let Some(path) = &args.histogram_csv {
            write_histogram_csv(path, &hist)?;
            println!("histogram written to {}", path.display());
        }
    } else if args.histogram_csv.is_some() {
        return Err("--histogram-csv needs --view".into());
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Describe { instrument } => describe(&instrument),
        Commands::Run(args) => run(args),
    };
    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
