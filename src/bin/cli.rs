//! atlas-admin CLI
//!
//! Command-line interface for node administration.

use std::time::{Duration, UNIX_EPOCH};

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};

use atlas_reply::config::DEFAULT_LOG_FILTER;
use atlas_reply::protocol::InfoSection;
use atlas_reply::{Config, Node};

/// atlas-admin
#[derive(Parser, Debug)]
#[command(name = "atlas-admin")]
#[command(about = "Administrative client for RESP key-value nodes")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    server: String,

    /// Read timeout in milliseconds (0 = none)
    #[arg(short, long, default_value = "5000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ping the server
    Ping {
        /// Give up after this many milliseconds
        #[arg(long)]
        within_ms: Option<u64>,
    },

    /// Show server information
    Info {
        #[arg(value_enum, default_value = "default")]
        section: Section,
    },

    /// Show memory statistics
    MemoryStats,

    /// Read configuration parameters
    ConfigGet {
        /// Parameter name or glob pattern
        parameter: String,
    },

    /// Set a configuration parameter
    ConfigSet { parameter: String, value: String },

    /// Start a background save
    BgSave {
        /// Defer until a running AOF rewrite finishes
        #[arg(long)]
        schedule: bool,
    },

    /// Save in the foreground
    Save,

    /// Show the time of the last successful save
    LastSave,

    /// Start an append-only file rewrite
    BgRewriteAof,

    /// Show the server clock
    Time,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Section {
    All,
    Default,
    Server,
    Clients,
    Memory,
    Persistence,
    Stats,
    Replication,
    Cpu,
    Commandstats,
    Cluster,
    Keyspace,
}

impl From<Section> for InfoSection {
    fn from(section: Section) -> Self {
        match section {
            Section::All => InfoSection::All,
            Section::Default => InfoSection::Default,
            Section::Server => InfoSection::Server,
            Section::Clients => InfoSection::Clients,
            Section::Memory => InfoSection::Memory,
            Section::Persistence => InfoSection::Persistence,
            Section::Stats => InfoSection::Stats,
            Section::Replication => InfoSection::Replication,
            Section::Cpu => InfoSection::Cpu,
            Section::Commandstats => InfoSection::CommandStats,
            Section::Cluster => InfoSection::Cluster,
            Section::Keyspace => InfoSection::Keyspace,
        }
    }
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .server_addr(&args.server)
        .read_timeout_ms(args.timeout_ms)
        .build();

    let node = match Node::connect(&config) {
        Ok(node) => node,
        Err(e) => {
            tracing::error!("Failed to connect to {}: {}", args.server, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&node, args.command) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(node: &Node<atlas_reply::network::Connection>, command: Commands) -> atlas_reply::Result<()> {
    match command {
        Commands::Ping { within_ms } => {
            let alive = match within_ms {
                Some(ms) => node.ping_timeout(Duration::from_millis(ms)),
                None => node.ping(),
            };
            println!("{}", if alive { "PONG" } else { "no reply" });
            if !alive {
                std::process::exit(2);
            }
        }
        Commands::Info { section } => print_map(node.info(section.into())?),
        Commands::MemoryStats => print_map(node.memory_statistics()?),
        Commands::ConfigGet { parameter } => print_map(node.config_get(&parameter)?),
        Commands::ConfigSet { parameter, value } => {
            node.config_set(&parameter, &value)?;
            println!("OK");
        }
        Commands::BgSave { schedule } => {
            if schedule {
                node.schedule_bg_save()?;
            } else {
                node.bg_save()?;
            }
            println!("Background save started");
        }
        Commands::Save => {
            node.save()?;
            println!("OK");
        }
        Commands::LastSave => {
            let at = node.last_save_time()?;
            let secs = at.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
            println!("{}", secs);
        }
        Commands::BgRewriteAof => {
            node.bg_rewrite_aof()?;
            println!("Background AOF rewrite started");
        }
        Commands::Time => {
            let time = node.time()?;
            println!("{}.{:06}", time.seconds, time.microseconds);
        }
    }
    Ok(())
}

fn print_map(map: std::collections::BTreeMap<String, String>) {
    for (key, value) in map {
        println!("{}: {}", key, value);
    }
}
