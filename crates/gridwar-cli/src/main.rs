use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gridwar_core::sweep::{run_sweep, SweepParam};
use gridwar_core::{SimConfig, Statistics, World};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const DEFAULT_MAX_TURNS: u64 = 100_000;

#[derive(Parser)]
#[command(name = "gridwar")]
#[command(about = "Turn-based resource and combat grid simulation")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single simulation to completion and print its statistics
    Run {
        /// Path to config file (JSON); missing fields take their defaults
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        num_agents: Option<usize>,

        #[arg(long)]
        env_size: Option<usize>,

        #[arg(long)]
        resource_prob: Option<f64>,

        /// Print the grid after every turn
        #[arg(long)]
        print_grid: bool,

        /// Give up after this many turns
        #[arg(long, default_value_t = DEFAULT_MAX_TURNS)]
        max_turns: u64,
    },
    /// Vary one parameter and count which strategy wins
    Sweep {
        /// num_agents, env_size, resource_prob, metabolic_rate or field_of_vision
        #[arg(long)]
        param: SweepParam,

        /// Comma-separated values; defaults to the standard range for the parameter
        #[arg(long, value_delimiter = ',')]
        values: Vec<f64>,

        /// Seeded runs per value
        #[arg(long, default_value_t = 100)]
        runs: u64,

        /// Base config file (JSON) for every field not being swept
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory receiving `<param>.txt`
        #[arg(long, default_value = "output")]
        out: PathBuf,

        #[arg(long, default_value_t = DEFAULT_MAX_TURNS)]
        max_turns: u64,
    },
    /// Dump the default configuration to stdout
    DumpDefaultConfig,
}

fn load_config(path: Option<&Path>) -> Result<SimConfig> {
    let Some(path) = path else {
        return Ok(SimConfig::default());
    };
    let file = File::open(path).with_context(|| format!("failed to open config file {path:?}"))?;
    let config: SimConfig =
        serde_json::from_reader(BufReader::new(file)).context("failed to parse config")?;
    Ok(config)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(config: SimConfig, print_grid: bool, max_turns: u64) -> Result<()> {
    config.validate().context("config validation error")?;
    let mut world = World::new(config).context("failed to initialise world")?;

    println!(
        "{:>6} {:>4} {:>10} {:>10} {:>9}",
        "agent", "fov", "resources", "metabolism", "strategy"
    );
    for agent in world.agents() {
        let s = agent.summary();
        println!(
            "{:>6} {:>4} {:>10} {:>10} {:>9}",
            s.id.0, s.fov_radius, s.resources, s.metabolic_rate, s.strategy
        );
    }
    if print_grid {
        println!("{world}");
    }

    let mut stats = Statistics::new();
    let mut turns = 0;
    while !world.is_finished() && turns < max_turns {
        world.advance_turn(&mut stats)?;
        turns += 1;
        if print_grid {
            println!("{world}");
        }
    }

    if !world.is_finished() {
        println!("Stopped after {turns} turns with {} agents alive", world.living_ids().len());
        return Ok(());
    }
    match world.winner() {
        Some(winner) => println!(
            "Agent {} won at timestep {} with strategy {}",
            winner.id(),
            world.timestep(),
            winner.strategy()
        ),
        None => println!("Draw at timestep {}", world.timestep()),
    }
    // A world that starts with one agent never runs a turn, so there is nothing to report.
    if stats.is_final() {
        let report = stats.report()?;
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn sweep(
    base: SimConfig,
    param: SweepParam,
    values: Vec<f64>,
    runs: u64,
    out: &Path,
    max_turns: u64,
) -> Result<()> {
    let values = if values.is_empty() {
        param.default_values()
    } else {
        values
    };
    let results = run_sweep(&base, param, &values, runs, max_turns)?;

    std::fs::create_dir_all(out).context("failed to create output directory")?;
    let path = out.join(format!("{param}.txt"));
    let file = File::create(&path).with_context(|| format!("failed to create {path:?}"))?;
    let mut writer = BufWriter::new(file);
    for (value, counts) in values.iter().zip(&results) {
        writeln!(writer, "{counts}")?;
        if counts.draws > 0 || counts.unfinished > 0 {
            tracing::warn!(
                %param,
                value,
                draws = counts.draws,
                unfinished = counts.unfinished,
                "runs without a winner are not in the histogram"
            );
        }
    }
    writer.flush()?;
    println!("Sweep of {param} written to {path:?}");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::DumpDefaultConfig => {
            let config = SimConfig::default();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Run {
            config,
            seed,
            num_agents,
            env_size,
            resource_prob,
            print_grid,
            max_turns,
        } => {
            let mut sim_config = load_config(config.as_deref())?;
            if let Some(seed) = seed {
                sim_config.seed = seed;
            }
            if let Some(num_agents) = num_agents {
                sim_config.num_agents = num_agents;
            }
            if let Some(env_size) = env_size {
                sim_config.env_size = env_size;
            }
            if let Some(resource_prob) = resource_prob {
                sim_config.resource_prob = resource_prob;
            }
            run(sim_config, print_grid, max_turns)?;
        }
        Commands::Sweep {
            param,
            values,
            runs,
            config,
            out,
            max_turns,
        } => {
            let base = load_config(config.as_deref())?;
            sweep(base, param, values, runs, &out, max_turns)?;
        }
    }
    Ok(())
}
