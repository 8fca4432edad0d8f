//! Connection Handler
//!
//! Blocking request/reply connection to one node.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use crate::config::Config;
use crate::error::{AtlasError, Result};
use crate::node::Transport;
use crate::protocol::{read_value, write_command, Command, RawValue, ReadLimits};

/// A client connection to a single node
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Limits applied to every reply
    limits: ReadLimits,

    /// Peer address for logging
    peer_addr: Option<SocketAddr>,

    /// Set once a request fails mid-exchange; the stream may hold a stale reply
    broken: bool,
}

impl Connection {
    /// Connect using the address and timeouts in `config`
    pub fn connect(config: &Config) -> Result<Self> {
        let addr = config.resolve()?;

        let stream = match config.connect_timeout() {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        }
        .map_err(|e| AtlasError::Network(format!("Failed to connect to {}: {}", addr, e)))?;

        let mut connection = Self::new(stream, ReadLimits::from(config))?;
        connection.set_timeouts(config.read_timeout(), config.write_timeout())?;
        Ok(connection)
    }

    /// Wrap an established stream
    pub fn new(stream: TcpStream, limits: ReadLimits) -> Result<Self> {
        let peer_addr = stream.peer_addr().ok();

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        tracing::debug!("Connected to {}", describe(peer_addr));

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            limits,
            peer_addr,
            broken: false,
        })
    }

    /// Configure connection timeouts (`None` blocks indefinitely)
    pub fn set_timeouts(&mut self, read: Option<Duration>, write: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(read)?;
        self.writer.get_ref().set_write_timeout(write)?;
        Ok(())
    }

    /// Send a command and read its complete reply
    ///
    /// A failed write or read leaves the connection broken: replies can no
    /// longer be matched to commands, so every later request is refused.
    pub fn request(&mut self, command: &Command) -> Result<RawValue> {
        if self.broken {
            return Err(AtlasError::Network(format!(
                "Connection to {} is broken by an earlier failed request",
                describe(self.peer_addr)
            )));
        }

        tracing::trace!("Sending {:?} to {}", command, describe(self.peer_addr));

        let reply = write_command(&mut self.writer, command)
            .and_then(|_| read_value(&mut self.reader, &self.limits));

        match reply {
            Ok(reply) => {
                tracing::trace!("Received {} reply from {}", reply.kind(), describe(self.peer_addr));
                Ok(reply)
            }
            Err(e) => {
                tracing::warn!(
                    "{} to {} failed, closing connection: {}",
                    command.name(),
                    describe(self.peer_addr),
                    e
                );
                self.broken = true;
                let _ = self.writer.get_ref().shutdown(Shutdown::Both);
                Err(e)
            }
        }
    }

    /// True once a request has failed mid-exchange
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Get the peer address
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }
}

impl Transport for Connection {
    fn request(&mut self, command: &Command) -> Result<RawValue> {
        Connection::request(self, command)
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        Ok(())
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }
}

fn describe(addr: Option<SocketAddr>) -> String {
    addr.map(|a| a.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
