//! Command definitions
//!
//! The administrative requests a node client issues.

use bytes::Bytes;

/// Sections accepted by INFO
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfoSection {
    All,
    Default,
    Server,
    Clients,
    Memory,
    Persistence,
    Stats,
    Replication,
    Cpu,
    CommandStats,
    Cluster,
    Keyspace,
}

impl InfoSection {
    /// Wire name of the section
    pub fn as_str(&self) -> &'static str {
        match self {
            InfoSection::All => "all",
            InfoSection::Default => "default",
            InfoSection::Server => "server",
            InfoSection::Clients => "clients",
            InfoSection::Memory => "memory",
            InfoSection::Persistence => "persistence",
            InfoSection::Stats => "stats",
            InfoSection::Replication => "replication",
            InfoSection::Cpu => "cpu",
            InfoSection::CommandStats => "commandstats",
            InfoSection::Cluster => "cluster",
            InfoSection::Keyspace => "keyspace",
        }
    }
}

/// An administrative command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Ping (health check)
    Ping,

    /// Server information, optionally restricted to one section
    Info { section: Option<InfoSection> },

    /// Read configuration parameters matching a pattern
    ConfigGet { parameter: String },

    /// Set one configuration parameter
    ConfigSet { parameter: String, value: String },

    /// Background save
    BgSave,

    /// Background save, deferred while an AOF rewrite is running
    BgSaveSchedule,

    /// Foreground save
    Save,

    /// Unix time of the last successful save
    LastSave,

    /// Trigger an append-only file rewrite
    BgRewriteAof,

    /// Server clock
    Time,

    /// Memory usage breakdown
    MemoryStats,
}

impl Command {
    /// Command name as sent on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping => "PING",
            Command::Info { .. } => "INFO",
            Command::ConfigGet { .. } | Command::ConfigSet { .. } => "CONFIG",
            Command::BgSave | Command::BgSaveSchedule => "BGSAVE",
            Command::Save => "SAVE",
            Command::LastSave => "LASTSAVE",
            Command::BgRewriteAof => "BGREWRITEAOF",
            Command::Time => "TIME",
            Command::MemoryStats => "MEMORY",
        }
    }

    /// Arguments following the command name
    pub fn args(&self) -> Vec<Bytes> {
        match self {
            Command::Info {
                section: Some(section),
            } => vec![Bytes::from_static(section.as_str().as_bytes())],
            Command::ConfigGet { parameter } => {
                vec![Bytes::from_static(b"GET"), Bytes::from(parameter.clone())]
            }
            Command::ConfigSet { parameter, value } => vec![
                Bytes::from_static(b"SET"),
                Bytes::from(parameter.clone()),
                Bytes::from(value.clone()),
            ],
            Command::BgSaveSchedule => vec![Bytes::from_static(b"SCHEDULE")],
            Command::MemoryStats => vec![Bytes::from_static(b"STATS")],
            Command::Ping
            | Command::Info { section: None }
            | Command::BgSave
            | Command::Save
            | Command::LastSave
            | Command::BgRewriteAof
            | Command::Time => Vec::new(),
        }
    }
}
