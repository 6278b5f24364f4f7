//! Connecting client facade (spec §4.8, §6).
//!
//! Grounded on `client/trivial.h`: `place`/`cancel` encode and write a
//! request frame; `receive_response`/`try_receive_responses` read one
//! frame at a time and dispatch to an event handler. The non-blocking
//! variant needs only `read_ready()`, which already answers "would a read
//! block right now" off the in-memory ring, so no raw `select`/poll
//! syscall is needed here.

use crate::engine::MatchEvent;
use crate::error::Result;
use crate::order::Side;
use crate::packet::{Request, Response, ResponseType, HEADER_LEN, MAX_REQUEST_FRAME_LEN};
use crate::socket::Socket;

/// Sink for responses read off the wire. Mirrors [`crate::engine::EventHandler`]
/// but on the client side, where a `Match` carries the same five fields
/// without the engine's internal type.
pub trait ClientEventHandler {
    fn on_place(&mut self, success: bool, id: u64);
    fn on_cancel(&mut self, success: bool, id: u64);
    fn on_match(&mut self, event: MatchEvent);
}

pub struct Client<const N: usize, H: ClientEventHandler> {
    socket: Socket<N>,
    handler: H,
}

impl<const N: usize, H: ClientEventHandler> Client<N, H> {
    pub fn connect(host: &str, port: &str, flush_threshold: usize, handler: H) -> Result<Self> {
        let socket = Socket::connect(host, port, flush_threshold)?;
        Ok(Client { socket, handler })
    }

    pub fn close(&mut self) {
        self.socket.close();
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    fn send(&self, request: &Request) -> Result<()> {
        let mut buf = [0u8; MAX_REQUEST_FRAME_LEN];
        let len = request.encode(&mut buf);
        self.socket.write(&buf[..len])?;
        Ok(())
    }

    pub fn place(&self, side: Side, id: u64, price: u32, quantity: u32) -> Result<()> {
        self.send(&Request::Place { side, id, price, quantity })
    }

    pub fn place_buy(&self, id: u64, price: u32, quantity: u32) -> Result<()> {
        self.place(Side::Buy, id, price, quantity)
    }

    pub fn place_sell(&self, id: u64, price: u32, quantity: u32) -> Result<()> {
        self.place(Side::Sell, id, price, quantity)
    }

    pub fn cancel(&self, side: Side, id: u64) -> Result<()> {
        self.send(&Request::Cancel { side, id })
    }

    pub fn cancel_buy(&self, id: u64) -> Result<()> {
        self.cancel(Side::Buy, id)
    }

    pub fn cancel_sell(&self, id: u64) -> Result<()> {
        self.cancel(Side::Sell, id)
    }

    /// Send a `Flush` request, then flush the local write ring so it goes
    /// out without waiting for `SOCKET_FLUSH_THRESHOLD` bytes to queue.
    pub fn flush(&self) -> Result<()> {
        self.send(&Request::Flush)?;
        self.socket.flush();
        Ok(())
    }

    /// Block for exactly one response frame and dispatch it.
    pub fn receive_response(&mut self) -> Result<()> {
        let mut header = [0u8; HEADER_LEN];
        self.socket.read(&mut header)?;
        let response_type =
            Response::peek_type(&header).ok_or(crate::error::ExchangeError::UnknownFrameType(header[0]))?;
        let response = match response_type {
            ResponseType::Place => Response::decode_place(&header),
            ResponseType::Cancel => Response::decode_cancel(&header),
            ResponseType::Match => {
                let mut payload = [0u8; 24];
                self.socket.read(&mut payload)?;
                Response::decode_match(&header, &payload)
            }
        };
        self.dispatch(response);
        Ok(())
    }

    /// Drain every response currently buffered without blocking for more.
    pub fn try_receive_responses(&mut self) -> Result<()> {
        while self.socket.read_ready() {
            self.receive_response()?;
        }
        Ok(())
    }

    fn dispatch(&mut self, response: Response) {
        match response {
            Response::Place { success, id } => self.handler.on_place(success, id),
            Response::Cancel { success, id } => self.handler.on_cancel(success, id),
            Response::Match {
                buy_id,
                sell_id,
                price,
                quantity,
                top_buy_price,
                top_sell_price,
            } => self.handler.on_match(MatchEvent {
                buy_id,
                sell_id,
                price,
                quantity,
                top_buy_price,
                top_sell_price,
            }),
        }
    }
}
