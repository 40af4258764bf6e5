//! Unravel CLI - run, generate and check smart ballots

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use unravel_ballot::{
    generate_batch, load_ballot, load_ballot_dir, write_ballot, write_batch, Profile,
};
use unravel_core::{Engine, Policy, PolicyReports, UnravelConfig};
use unravel_cycles::level_cycles;
use unravel_logic::OutcomeVector;

#[derive(Parser)]
#[command(name = "unravel")]
#[command(about = "Unravel smart ballots under the U, DU, RU and DRU policies")]
#[command(version)]
struct Cli {
    /// Log at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Run policies over a ballot file or a directory of ballots
    Run {
        /// Ballot file, or a directory of `.csv` ballots
        ballot: PathBuf,
        /// Policy to run (repeatable; defaults to all four)
        #[arg(short, long = "policy")]
        policies: Vec<Policy>,
        /// Seed for the randomized policies
        #[arg(short, long)]
        seed: Option<u64>,
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Run policies concurrently
        #[arg(long)]
        concurrent: bool,
        /// Print every commit
        #[arg(long)]
        trace: bool,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Generate random valid ballots
    Generate {
        /// Number of agents
        #[arg(short, long)]
        agents: Option<usize>,
        /// Number of preference levels
        #[arg(short, long)]
        levels: Option<usize>,
        /// Generator seed
        #[arg(short, long)]
        seed: Option<u64>,
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Number of ballots; more than one writes a numbered batch into `--out`
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
        /// Output file, or directory for a batch (stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Validate a ballot file and show its structure
    Check {
        /// Ballot file
        ballot: PathBuf,
    },
    /// List the resolution policies
    Policies,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Run {
            ballot,
            policies,
            seed,
            config,
            concurrent,
            trace,
            json,
        }) => {
            let mut config = load_config(config.as_deref())?;
            if !policies.is_empty() {
                config.engine.policies = policies;
            }
            if seed.is_some() {
                config.engine.seed = seed;
            }
            config.engine.concurrent |= concurrent;
            config.engine.record_trace |= trace;
            run_ballot(&ballot, config, json).await?;
        }
        Some(Commands::Generate {
            agents,
            levels,
            seed,
            config,
            count,
            out,
        }) => {
            let mut config = load_config(config.as_deref())?;
            if let Some(agents) = agents {
                config.generator.agents = agents;
            }
            if let Some(levels) = levels {
                config.generator.levels = levels;
            }
            let seed = seed.or(config.engine.seed).unwrap_or_else(rand::random);
            info!(seed, count, "generating ballots");

            let mut rng = StdRng::seed_from_u64(seed);
            let batch = generate_batch(&config.generator, count, &mut rng)?;
            match (out, batch.as_slice()) {
                (_, []) => {}
                (Some(path), [profile]) => {
                    write_ballot(profile, &path)?;
                    info!(path = %path.display(), fingerprint = %profile.fingerprint(), "ballot written");
                }
                (None, [profile]) => print!("{}", profile.to_ballot_text()),
                (Some(dir), _) => {
                    let written = write_batch(&batch, &config.generator, &dir)?;
                    info!(dir = %dir.display(), ballots = written.len(), "batch written");
                }
                (None, _) => anyhow::bail!("--out <DIR> is required when --count exceeds 1"),
            }
        }
        Some(Commands::Check { ballot }) => {
            let profile = read_profile(&ballot)?;
            print_structure(&ballot, &profile);
        }
        Some(Commands::Policies) => print_policies(),
        None => {
            println!("unravel v{} - Use --help for commands", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<UnravelConfig> {
    match path {
        Some(path) => Ok(UnravelConfig::load(path)?),
        None => Ok(UnravelConfig::default()),
    }
}

fn read_profile(path: &Path) -> Result<Profile> {
    load_ballot(path).with_context(|| format!("failed to load ballot {}", path.display()))
}

async fn run_ballot(path: &Path, config: UnravelConfig, json: bool) -> Result<()> {
    let ballots = if path.is_dir() {
        load_ballot_dir(path)
            .with_context(|| format!("failed to load ballots in {}", path.display()))?
    } else {
        vec![(path.to_path_buf(), read_profile(path)?)]
    };
    if ballots.is_empty() {
        anyhow::bail!("no .csv ballots found in {}", path.display());
    }

    let engine = Engine::new(config.engine)?;
    let seed = engine.resolve_seed();
    let randomized = engine.config().policies.iter().any(|p| p.is_randomized());
    if engine.config().seed.is_none() && randomized {
        info!(seed, "no seed given, drew one at random");
    }

    let mut docs = Vec::with_capacity(ballots.len());
    for (i, (ballot, profile)) in ballots.into_iter().enumerate() {
        let reports = if engine.config().concurrent {
            engine
                .run_all_concurrent(Arc::new(profile.clone()), seed)
                .await?
        } else {
            engine.run_all_seeded(&profile, seed)?
        };

        if json {
            docs.push(serde_json::json!({
                "ballot": ballot.display().to_string(),
                "fingerprint": profile.fingerprint(),
                "agents": profile.agent_count(),
                "levels": profile.max_level(),
                "seed": seed,
                "reports": reports,
            }));
        } else {
            if i > 0 {
                println!();
            }
            print_header(&ballot, &profile);
            println!("seed      {}", seed);
            println!();
            print_reports(&profile, &reports);
        }
    }

    if json {
        let doc = match docs.len() {
            1 => docs.remove(0),
            _ => serde_json::Value::Array(docs),
        };
        println!("{}", serde_json::to_string_pretty(&doc)?);
    }
    Ok(())
}

fn print_header(path: &Path, profile: &Profile) {
    println!("ballot    {}", path.display());
    println!(
        "agents    {}, levels {}",
        profile.agent_count(),
        profile.max_level()
    );
    println!("sha256    {}", profile.fingerprint());
}

fn print_reports(profile: &Profile, reports: &PolicyReports) {
    let roster = profile.roster();
    for report in reports.values() {
        println!("{}", report.summary());
        for cycle in &report.cycles {
            println!("    cycle  {}", cycle.render(roster));
        }
        for entry in &report.trace {
            let c = entry.commit;
            println!(
                "    round {} level {}: {} = {} ({})",
                entry.round,
                c.level,
                roster.name(c.agent),
                c.bit,
                if c.is_direct() { "direct" } else { "delegated" }
            );
        }
    }
}

fn print_structure(path: &Path, profile: &Profile) {
    print_header(path, profile);
    println!();

    let forms: Vec<String> = profile
        .form_counts()
        .iter()
        .map(|(kind, n)| format!("{kind} {n}"))
        .collect();
    println!("forms     {}", forms.join(", "));
    println!();

    let roster = profile.roster();
    let width = roster.names().iter().map(String::len).max().unwrap_or(1);
    for agent in roster.ids() {
        let cells: Vec<String> = profile
            .row(agent)
            .iter()
            .filter(|e| !e.is_blank())
            .map(|e| e.display(roster).to_string())
            .collect();
        println!(
            "{:<width$}  votes at level {}  {}",
            roster.name(agent),
            profile.terminal_level(agent).unwrap_or(0),
            cells.join(" | "),
            width = width
        );
    }

    // Cycles among agents before anything is resolved.
    let nobody = OutcomeVector::new(profile.agent_count()).snapshot();
    println!();
    for level in 1..=profile.max_level() {
        let cycles = level_cycles(profile, &nobody, level);
        println!("level {}  {} initial cycle(s)", level, cycles.len());
        for cycle in cycles {
            println!("    {}", cycle.render(roster));
        }
    }
}

fn print_policies() {
    for policy in Policy::ALL {
        let mut traits = Vec::new();
        if policy.has_direct_priority() {
            traits.push("direct priority");
        }
        if policy.is_randomized() {
            traits.push("seeded");
        }
        println!(
            "{:<4} {:<66} {}",
            policy.code(),
            policy.description(),
            traits.join(", ")
        );
    }
}
