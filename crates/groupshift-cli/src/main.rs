use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "groupshift",
    about = "groupshift — elastic compute group lifecycle against a simulated region",
    version,
    propagate_version = true
)]
struct Cli {
    /// World file holding the simulated region. Created if missing.
    #[arg(short, long, global = true, default_value = "world.json")]
    world: PathBuf,
    /// groupshift.toml with lifecycle settings
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Region to open sessions in (default: the world's region)
    #[arg(short, long, global = true)]
    region: Option<String>,
    /// Diagnostic log format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum HealthArg {
    /// Every member's machine is running
    Running,
    /// Every member is InService and Healthy
    InService,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the newest serving group owned by an identifier, or the defaults
    Locate {
        #[arg(short, long)]
        identifier: String,
    },
    /// Fit a group's bounds to a desired capacity and wait for steady state
    Scale {
        #[arg(short, long)]
        group: String,
        #[arg(short, long)]
        desired: u32,
        #[arg(long, default_value_t = 10)]
        timeout_mins: u64,
        /// Override the configured health predicate
        #[arg(long, value_enum)]
        health: Option<HealthArg>,
    },
    /// Delete groups and their launch configurations
    Teardown {
        #[arg(short, long = "group", required = true)]
        groups: Vec<String>,
    },
    /// Move scaling policies and scheduled actions from one group to another
    Migrate {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
    /// Add or overwrite a group tag
    Tag {
        #[arg(short, long)]
        group: String,
        #[arg(short, long)]
        key: String,
        #[arg(short, long)]
        value: String,
    },
}

fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    // Operator lines are printed by the log sink; keep their tracing mirror quiet.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn,groupshift_lifecycle=info,groupshift::execution=off"))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    let env = commands::Env::open(&cli.world, cli.config.as_deref(), cli.region.as_deref())?;
    let result = match cli.command {
        Commands::Locate { identifier } => commands::locate::run(&env, &identifier).await,
        Commands::Scale {
            group,
            desired,
            timeout_mins,
            health,
        } => commands::scale::run(&env, &group, desired, timeout_mins, health).await,
        Commands::Teardown { groups } => commands::teardown::run(&env, &groups).await,
        Commands::Migrate { from, to } => commands::migrate::run(&env, &from, &to).await,
        Commands::Tag { group, key, value } => {
            commands::tag::run(&env, &group, &key, &value).await
        }
    };
    env.persist()?;
    result
}
