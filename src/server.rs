//! Listening server facade (spec §4.8, §6).
//!
//! Grounded on `server/trivial.h`: accept one connection, read a header to
//! learn the request type, read the rest of the frame, dispatch to the
//! engine, and let the engine's callbacks write responses back out. Unlike
//! the original, which keeps a single raw `fd_` and trusts the caller to
//! only run one connection at a time, `Server` here explicitly serves
//! connections one after another — the order book is process-global state
//! the spec deliberately keeps single-threaded, so there is no concurrent
//! accept loop to race it.

use tracing::{info, warn};

use crate::engine::{EventHandler, Exchange, MatchEvent};
use crate::error::{ExchangeError, Result};
use crate::packet::{Request, RequestType, Response, HEADER_LEN, MAX_RESPONSE_FRAME_LEN};
use crate::socket::{Listener, Socket};

/// Writes engine callbacks straight out to whichever connection is
/// currently being served; `None` while idle between connections, mirrors
/// the original's `fd_ == -1` guard.
struct ResponseWriter<const N: usize> {
    socket: Option<Socket<N>>,
}

impl<const N: usize> EventHandler for ResponseWriter<N> {
    fn on_place(&mut self, success: bool, id: u64) {
        self.send(&Response::Place { success, id });
    }

    fn on_cancel(&mut self, success: bool, id: u64) {
        self.send(&Response::Cancel { success, id });
    }

    fn on_match(&mut self, event: MatchEvent) {
        self.send(&Response::Match {
            buy_id: event.buy_id,
            sell_id: event.sell_id,
            price: event.price,
            quantity: event.quantity,
            top_buy_price: event.top_buy_price,
            top_sell_price: event.top_sell_price,
        });
    }
}

impl<const N: usize> ResponseWriter<N> {
    fn send(&mut self, response: &Response) {
        let Some(socket) = &self.socket else { return };
        let mut buf = [0u8; MAX_RESPONSE_FRAME_LEN];
        let len = response.encode(&mut buf);
        if let Err(err) = socket.write(&buf[..len]) {
            warn!(error = %err, "failed writing response to client");
        }
    }
}

/// An engine bound to a listening socket. `N` is the duplex ring capacity
/// per connection, `SOCKET_BUFFER_SIZE` in spec terms.
pub struct Server<const N: usize> {
    exchange: Exchange<ResponseWriter<N>>,
    flush_threshold: usize,
}

impl<const N: usize> Server<N> {
    pub fn new(order_book_capacity: usize, flush_threshold: usize) -> Self {
        Server {
            exchange: Exchange::with_capacity(ResponseWriter { socket: None }, order_book_capacity),
            flush_threshold,
        }
    }

    /// Bind, then serve connections one at a time until a fatal listener
    /// error occurs (address already taken, resolution failure, ...).
    /// Per-connection errors (peer disconnects, malformed reads) are
    /// logged and the server moves on to the next `accept`.
    pub fn listen(&mut self, host: &str, port: &str) -> Result<()> {
        let listener = Listener::bind(host, port)?;
        info!(host, port, "server listening");
        loop {
            let (socket, peer) = listener.accept::<N>(self.flush_threshold)?;
            info!(%peer, "accepted connection");
            self.exchange.handler_mut().socket = Some(socket);
            if let Err(err) = self.serve_connection() {
                warn!(error = %err, "connection ended");
            }
            if let Some(mut socket) = self.exchange.handler_mut().socket.take() {
                socket.close();
            }
        }
    }

    fn serve_connection(&mut self) -> Result<()> {
        loop {
            let mut header = [0u8; HEADER_LEN];
            self.read_exact(&mut header)?;
            let request_type =
                Request::peek_type(&header).ok_or(ExchangeError::UnknownFrameType(header[0]))?;
            match request_type {
                RequestType::Place => {
                    let mut payload = [0u8; 8];
                    self.read_exact(&mut payload)?;
                    if let Request::Place { side, id, price, quantity } = Request::decode_place(&header, &payload) {
                        self.exchange.place(side, id, price, quantity);
                    }
                }
                RequestType::Cancel => {
                    if let Request::Cancel { side, id } = Request::decode_cancel(&header) {
                        self.exchange.cancel(side, id);
                    }
                }
                RequestType::Flush => {
                    self.socket().flush();
                }
            }
        }
    }

    fn socket(&self) -> &Socket<N> {
        self.exchange
            .handler()
            .socket
            .as_ref()
            .expect("serve_connection called without an active connection")
    }

    fn read_exact(&self, buf: &mut [u8]) -> Result<()> {
        let n = self.socket().read(buf)?;
        if n != buf.len() {
            return Err(ExchangeError::ConnectionLost);
        }
        Ok(())
    }
}

