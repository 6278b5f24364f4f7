//! Convenience re-exports for downstream users of the `limitbook` library.

pub use crate::client::{Client, ClientEventHandler};
pub use crate::config::{DEFAULT_HOST, DEFAULT_PORT, ORDER_BOOK_INIT_SIZE, SOCKET_BUFFER_SIZE, SOCKET_FLUSH_THRESHOLD};
pub use crate::engine::{EventHandler, Exchange, MatchEvent};
pub use crate::error::{ExchangeError, Result};
pub use crate::order::{Order, Side};
pub use crate::server::Server;
