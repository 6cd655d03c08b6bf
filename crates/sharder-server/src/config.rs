//! Server Configuration
//!
//! Command-line flags with environment variable fallbacks. The shard range and
//! worker count are fixed for the lifetime of the process.

use clap::Parser;
use sharder_core::ShardId;
use std::time::Duration;

/// Settings consumed by the coordinator core.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// First shard ID in the range (inclusive)
    pub first_shard: ShardId,
    /// Last shard ID in the range (inclusive)
    pub last_shard: ShardId,
    /// Number of worker slots the range is partitioned over
    pub workers: usize,
    /// Capacity of each connection's outbound queue
    pub outbound_buffer: usize,
    /// How long a closing connection may take to flush its queue
    pub writer_close_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            first_shard: 0,
            last_shard: 0,
            workers: 1,
            outbound_buffer: 256,
            writer_close_timeout: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "sharder-server")]
#[command(about = "Assigns shards to connected workers and routes messages between them")]
#[command(version)]
pub struct Cli {
    /// First shard ID (inclusive)
    #[arg(long, env = "FIRST_SHARD", default_value_t = 0, allow_negative_numbers = true)]
    pub first_shard: ShardId,

    /// Last shard ID (inclusive)
    #[arg(long, env = "LAST_SHARD", allow_negative_numbers = true)]
    pub last_shard: ShardId,

    /// Number of workers the shard range is split across
    #[arg(long, env = "WORKERS")]
    pub workers: usize,

    /// Address the HTTP/WebSocket server binds to
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: String,

    /// Frames buffered per connection before senders wait
    #[arg(long, env = "OUTBOUND_BUFFER", default_value_t = 256)]
    pub outbound_buffer: usize,

    /// Time allowed for connections to close on shutdown (milliseconds)
    #[arg(long, env = "SHUTDOWN_GRACE_MS", default_value_t = 2000)]
    pub shutdown_grace_ms: u64,

    /// Time allowed for a closing connection to flush (milliseconds)
    #[arg(long, env = "WRITER_CLOSE_TIMEOUT_MS", default_value_t = 1000)]
    pub writer_close_timeout_ms: u64,
}

impl Cli {
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            first_shard: self.first_shard,
            last_shard: self.last_shard,
            workers: self.workers,
            outbound_buffer: self.outbound_buffer,
            writer_close_timeout: Duration::from_millis(self.writer_close_timeout_ms),
        }
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}
