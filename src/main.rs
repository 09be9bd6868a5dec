use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tunekit::init_logging;
use tunekit_core::ParameterProfile;
use tunekit_gcodegen::{read_command_table, GcodeTransformer, TransformParameters};
use tunekit_tuning::{Experiment, ExperimentConfig, RecordingSink, ReplaySource, WriterSink};

/// Hot-end tuning and G-code reprocessing toolkit
#[derive(Parser)]
#[command(name = "tunekit", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rewrite a recorded command table into a firmware instruction stream
    Process(ProcessArgs),
    /// Rehearse a tuning experiment against recorded temperature data
    Experiment(ExperimentArgs),
}

#[derive(Args)]
struct ProcessArgs {
    /// Recorded command table (seven numeric columns per row)
    #[arg(short, long)]
    input: PathBuf,

    /// Output path for the generated instruction stream
    #[arg(short, long)]
    output: PathBuf,

    /// Parameter file (.json or .toml); profile flags override it
    #[arg(long)]
    params: Option<PathBuf>,

    /// Proportional gain, scalar or comma-separated keyframes
    #[arg(long)]
    kp: Option<ParameterProfile>,

    /// Integral gain, scalar or comma-separated keyframes
    #[arg(long)]
    ki: Option<ParameterProfile>,

    /// Derivative gain, scalar or comma-separated keyframes
    #[arg(long)]
    kd: Option<ParameterProfile>,

    /// Nozzle temperature in degrees C, scalar or keyframes
    #[arg(long)]
    nozzle_temp: Option<ParameterProfile>,

    /// Bed temperature in degrees C, scalar or keyframes
    #[arg(long)]
    bed_temp: Option<ParameterProfile>,

    /// Feed rate multiplier, scalar or keyframes
    #[arg(long)]
    speed_factor: Option<ParameterProfile>,

    /// Extrusion multiplier, scalar or keyframes
    #[arg(long)]
    extrusion_factor: Option<ParameterProfile>,

    /// Retraction length in mm, scalar or keyframes
    #[arg(long)]
    retraction: Option<ParameterProfile>,

    /// Part fan speed (0-255), scalar or keyframes
    #[arg(long)]
    fan_speed: Option<ParameterProfile>,
}

#[derive(Args)]
struct ExperimentArgs {
    /// Experiment configuration (.json or .toml)
    #[arg(short, long)]
    config: PathBuf,

    /// Recorded nozzle readings to replay (CSV)
    #[arg(long)]
    replay: PathBuf,

    /// Output path for the sampled temperature log (CSV)
    #[arg(short, long)]
    output: PathBuf,

    /// Also capture every issued firmware command to this file
    #[arg(long)]
    commands: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    init_logging()?;

    match Cli::parse().command {
        Command::Process(args) => process(args),
        Command::Experiment(args) => experiment(args),
    }
}

fn process(args: ProcessArgs) -> anyhow::Result<()> {
    let mut params = match &args.params {
        Some(path) => TransformParameters::load_from_file(path)?,
        None => TransformParameters::default(),
    };
    if let Some(profile) = args.kp {
        params.kp = profile;
    }
    if let Some(profile) = args.ki {
        params.ki = profile;
    }
    if let Some(profile) = args.kd {
        params.kd = profile;
    }
    if let Some(profile) = args.nozzle_temp {
        params.nozzle_temp = profile;
    }
    if let Some(profile) = args.bed_temp {
        params.bed_temp = profile;
    }
    if let Some(profile) = args.speed_factor {
        params.speed_factor = profile;
    }
    if let Some(profile) = args.extrusion_factor {
        params.extrusion_factor = profile;
    }
    if let Some(profile) = args.retraction {
        params.retraction = profile;
    }
    if let Some(profile) = args.fan_speed {
        params.fan_speed = profile;
    }

    let commands = read_command_table(&args.input)?;
    tracing::info!(
        "Loaded {} commands from {}",
        commands.len(),
        args.input.display()
    );

    let stream = GcodeTransformer::new(params).transform(&commands)?;

    // The stream is persisted verbatim, exactly once
    std::fs::write(&args.output, &stream)?;
    tracing::info!("Wrote {} bytes to {}", stream.len(), args.output.display());
    Ok(())
}

fn experiment(args: ExperimentArgs) -> anyhow::Result<()> {
    let config = ExperimentConfig::load_from_file(&args.config)?;
    let mut source = ReplaySource::from_csv_file(&args.replay)?;
    tracing::info!(
        "Rehearsing against {} recorded readings",
        source.len()
    );

    let log = if let Some(commands_path) = &args.commands {
        let file = std::fs::File::create(commands_path)?;
        let mut sink = WriterSink::new(std::io::BufWriter::new(file));
        Experiment::new(config).run(&mut sink, &mut source)?
    } else {
        let mut sink = RecordingSink::new();
        let log = Experiment::new(config).run(&mut sink, &mut source)?;
        tracing::info!("Issued {} firmware commands", sink.commands().len());
        log
    };

    log.save_csv(&args.output)?;
    tracing::info!(
        "Saved {} samples to {}",
        log.samples().len(),
        args.output.display()
    );
    Ok(())
}
