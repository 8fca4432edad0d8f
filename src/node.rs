//! Node Module
//!
//! Administrative operations against a single node.
//!
//! Every operation is one request and one reply; the only work done here is
//! choosing the decoder that matches the reply shape:
//!
//! | Operation        | Reply shape                         | Decoder                    |
//! |------------------|-------------------------------------|----------------------------|
//! | INFO             | bulk text, `field:value` lines      | `InfoDecoder`              |
//! | CONFIG GET       | flat `[name, value, ...]` / map     | `MapDecoder`               |
//! | MEMORY STATS     | flat pairs, some values nested      | `NestedMultiDecoder`       |
//! | TIME             | `[seconds, microseconds]`           | `ListDecoder`              |
//! | LASTSAVE         | integer                             | `IntegerDecoder`           |
//! | PING, SAVE, ...  | status line                         | `StringDecoder`            |

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use crate::config::Config;
use crate::decode::{
    self, CollectMap, IntegerDecoder, InfoDecoder, ListDecoder, MapDecoder,
    NestedMultiDecoder, PairDecoder, StringDecoder, TextDecoder,
};
use crate::error::{AtlasError, DecodeError, Result};
use crate::network::Connection;
use crate::protocol::{Command, InfoSection, RawValue};

/// Width of a key/value unit
const PAIR: NonZeroUsize = match NonZeroUsize::new(2) {
    Some(width) => width,
    None => unreachable!(),
};

/// Request/reply channel to one node
pub trait Transport: Send {
    /// Send a command and return its complete, tokenized reply
    fn request(&mut self, command: &Command) -> Result<RawValue>;

    /// Change how long `request` waits for a reply (`None` = forever)
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()>;

    fn peer_addr(&self) -> Option<SocketAddr>;
}

/// Server clock as reported by TIME
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Time {
    pub seconds: i64,
    pub microseconds: i64,
}

impl Time {
    /// Convert to a SystemTime
    ///
    /// `None` for negative fields, microseconds outside a second, or an
    /// instant the platform clock cannot represent.
    pub fn to_system_time(&self) -> Option<SystemTime> {
        let secs = u64::try_from(self.seconds).ok()?;
        let micros = u64::try_from(self.microseconds).ok().filter(|m| *m < 1_000_000)?;
        UNIX_EPOCH
            .checked_add(Duration::from_secs(secs))?
            .checked_add(Duration::from_micros(micros))
    }
}

type MemoryStatsDecoder =
    NestedMultiDecoder<PairDecoder<StringDecoder, TextDecoder>, CollectMap<String, String>>;

/// Decoders shared by every call on a node
struct Decoders {
    config: MapDecoder<StringDecoder, StringDecoder>,
    memory_stats: MemoryStatsDecoder,
    time: ListDecoder<IntegerDecoder>,
}

impl Decoders {
    fn new() -> Self {
        Self {
            config: MapDecoder::new(StringDecoder, StringDecoder),
            memory_stats: NestedMultiDecoder::new(
                PairDecoder::new(StringDecoder, TextDecoder),
                CollectMap::new(),
                PAIR,
                true,
            ),
            time: ListDecoder::new(IntegerDecoder),
        }
    }
}

/// Administrative handle on one node
pub struct Node<T> {
    transport: Mutex<T>,

    /// Read timeout restored after a timed ping
    read_timeout: Option<Duration>,

    decoders: Decoders,
}

impl Node<Connection> {
    /// Connect to the node named in `config`
    pub fn connect(config: &Config) -> Result<Self> {
        let connection = Connection::connect(config)?;
        Ok(Self::with_read_timeout(connection, config.read_timeout()))
    }
}

impl<T: Transport> Node<T> {
    /// Wrap a transport that has no read timeout
    pub fn new(transport: T) -> Self {
        Self::with_read_timeout(transport, None)
    }

    /// Wrap a transport whose normal read timeout is `read_timeout`
    pub fn with_read_timeout(transport: T, read_timeout: Option<Duration>) -> Self {
        Self {
            transport: Mutex::new(transport),
            read_timeout,
            decoders: Decoders::new(),
        }
    }

    /// Address of the node, if the transport knows it
    pub fn addr(&self) -> Option<SocketAddr> {
        self.transport.lock().peer_addr()
    }

    fn call(&self, command: Command) -> Result<RawValue> {
        tracing::debug!("{} {:?}", command.name(), command.args());
        self.transport.lock().request(&command)
    }

    fn status(&self, command: Command) -> Result<String> {
        let reply = self.call(command)?;
        Ok(decode::decode_scalar(&reply, &StringDecoder)?)
    }

    fn expect_ok(&self, command: Command) -> Result<()> {
        let status = self.status(command)?;
        if status != "OK" {
            return Err(AtlasError::UnexpectedReply(format!("expected OK, got {:?}", status)));
        }
        Ok(())
    }

    // =========================================================================
    // Liveness
    // =========================================================================

    /// True if the node answers PONG
    pub fn ping(&self) -> bool {
        match self.status(Command::Ping) {
            Ok(reply) => reply == "PONG",
            Err(e) => {
                tracing::warn!("PING failed: {}", e);
                false
            }
        }
    }

    /// True if the node answers PONG within `timeout`
    pub fn ping_timeout(&self, timeout: Duration) -> bool {
        let mut transport = self.transport.lock();

        let reply = transport
            .set_read_timeout(Some(timeout))
            .and_then(|_| transport.request(&Command::Ping))
            .and_then(|raw| Ok(decode::decode_scalar(&raw, &StringDecoder)?));

        if let Err(e) = transport.set_read_timeout(self.read_timeout) {
            tracing::warn!("Failed to restore read timeout: {}", e);
        }

        match reply {
            Ok(reply) => reply == "PONG",
            Err(e) => {
                tracing::warn!("PING within {:?} failed: {}", timeout, e);
                false
            }
        }
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Server information for one section
    pub fn info(&self, section: InfoSection) -> Result<BTreeMap<String, String>> {
        let reply = self.call(Command::Info {
            section: Some(section),
        })?;
        Ok(decode::decode_scalar(&reply, &InfoDecoder)?)
    }

    /// MEMORY STATS as strings; nested values are rendered as text
    pub fn memory_statistics(&self) -> Result<BTreeMap<String, String>> {
        let reply = self.call(Command::MemoryStats)?;
        Ok(decode::decode(&reply, &self.decoders.memory_stats)?.unwrap_or_default())
    }

    /// Server clock
    pub fn time(&self) -> Result<Time> {
        let reply = self.call(Command::Time)?;
        let parts = decode::decode(&reply, &self.decoders.time)?.unwrap_or_default();

        match parts[..] {
            [seconds, microseconds] if (0..1_000_000).contains(&microseconds) => Ok(Time {
                seconds,
                microseconds,
            }),
            [_, microseconds] => Err(AtlasError::UnexpectedReply(format!(
                "TIME microseconds out of range: {}",
                microseconds
            ))),
            _ => Err(DecodeError::Arity {
                group: 2,
                actual: parts.len(),
            }
            .into()),
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Parameters matching `parameter` (glob patterns allowed)
    pub fn config_get(&self, parameter: &str) -> Result<BTreeMap<String, String>> {
        let reply = self.call(Command::ConfigGet {
            parameter: parameter.to_string(),
        })?;
        Ok(decode::decode(&reply, &self.decoders.config)?.unwrap_or_default())
    }

    pub fn config_set(&self, parameter: &str, value: &str) -> Result<()> {
        self.expect_ok(Command::ConfigSet {
            parameter: parameter.to_string(),
            value: value.to_string(),
        })
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    pub fn bg_save(&self) -> Result<()> {
        let status = self.status(Command::BgSave)?;
        tracing::debug!("BGSAVE: {}", status);
        Ok(())
    }

    /// Background save, deferred until a running AOF rewrite finishes
    pub fn schedule_bg_save(&self) -> Result<()> {
        let status = self.status(Command::BgSaveSchedule)?;
        tracing::debug!("BGSAVE SCHEDULE: {}", status);
        Ok(())
    }

    /// Blocking save
    pub fn save(&self) -> Result<()> {
        self.expect_ok(Command::Save)
    }

    /// Time of the last successful save
    pub fn last_save_time(&self) -> Result<SystemTime> {
        let reply = self.call(Command::LastSave)?;
        let seconds = decode::decode_scalar(&reply, &IntegerDecoder)?;
        let seconds = u64::try_from(seconds).map_err(|_| {
            AtlasError::UnexpectedReply(format!("negative LASTSAVE timestamp {}", seconds))
        })?;
        UNIX_EPOCH
            .checked_add(Duration::from_secs(seconds))
            .ok_or_else(|| {
                AtlasError::UnexpectedReply(format!("LASTSAVE timestamp out of range: {}", seconds))
            })
    }

    pub fn bg_rewrite_aof(&self) -> Result<()> {
        let status = self.status(Command::BgRewriteAof)?;
        tracing::debug!("BGREWRITEAOF: {}", status);
        Ok(())
    }
}
