//! Compile-time transport knobs and the server/bench CLI surface (spec §6).

use clap::Parser;

/// Bytes of capacity in each direction's ring buffer (spec's
/// `SOCKET_BUFFER_SIZE`).
pub const SOCKET_BUFFER_SIZE: usize = 4096;

/// Minimum batch, in bytes, a reader/writer daemon will wait to accumulate
/// before acting on its own — an explicit `flush()` call overrides this
/// (spec's `SOCKET_FLUSH_THRESHOLD`).
pub const SOCKET_FLUSH_THRESHOLD: usize = 256;

/// Initial id-index capacity reserved per order book side on startup
/// (spec's `ORDER_BOOK_INIT_SIZE`).
pub const ORDER_BOOK_INIT_SIZE: usize = 1024;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;

/// `server [port] [host]` — both positional and optional, per spec §6.
#[derive(Parser, Debug)]
#[command(name = "limitbook-server", about = "Single-instrument limit order matching engine server")]
pub struct ServerArgs {
    /// TCP port to listen on.
    #[arg(default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Host/interface to bind.
    #[arg(default_value = DEFAULT_HOST)]
    pub host: String,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// CLI surface for the `bench` load-generator/latency-harness driver.
#[derive(Parser, Debug)]
#[command(name = "limitbook-bench", about = "Load-generator and latency harness for limitbook")]
pub struct BenchArgs {
    /// Host the target server is listening on.
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port the target server is listening on.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Number of orders to place during the run.
    #[arg(long, default_value_t = 10_000)]
    pub orders: u64,
}
