//! Bit-packed wire frames for requests and responses (spec §4.1, §6).
//!
//! The discriminant lives in the low bits of the id word rather than as a
//! separate tag byte, so a `Place`/`Cancel`/`Flush` request (or a
//! `Place`/`Cancel`/`Match` response) carries no wasted header byte. All
//! multi-byte fields are little-endian on the wire. Each frame decodes into
//! an ordinary Rust enum carrying its already-unpacked fields, rather than
//! a byte-for-byte struct overlay — there is no safe, endian-portable
//! equivalent of punning a `union` directly onto the wire bytes.

use crate::bits::{discard_bits, extract_bits};
use crate::order::Side;

const REQUEST_TYPE_BITS: u32 = 2;
const REQUEST_SIDE_BITS: u32 = 1;
const RESPONSE_TYPE_BITS: u32 = 2;
const RESPONSE_SUCCESS_BITS: u32 = 1;

const REQUEST_TYPE_PLACE: u64 = 0b00;
const REQUEST_TYPE_CANCEL: u64 = 0b01;
const REQUEST_TYPE_FLUSH: u64 = 0b10;

const RESPONSE_TYPE_PLACE: u64 = 0b00;
const RESPONSE_TYPE_CANCEL: u64 = 0b01;
const RESPONSE_TYPE_MATCH: u64 = 0b10;

/// Size in bytes of the header word every frame begins with. A receiver
/// reads this many bytes first, inspects the low two bits, and then reads
/// the rest of the variant.
pub const HEADER_LEN: usize = 8;

/// Largest request frame on the wire (`Place`: 8 + 4 + 4).
pub const MAX_REQUEST_FRAME_LEN: usize = 16;

/// Largest response frame on the wire (`Match`: 8 + 8 + 4 + 4 + 4 + 4).
pub const MAX_RESPONSE_FRAME_LEN: usize = 32;

fn side_bit(side: Side) -> u64 {
    match side {
        Side::Buy => 0,
        Side::Sell => 1,
    }
}

fn side_from_bit(bit: u64) -> Side {
    if bit == 0 { Side::Buy } else { Side::Sell }
}

fn construct_request_id(ty: u64, side: Side, id: u64) -> u64 {
    let id = id << REQUEST_SIDE_BITS;
    let id = id | side_bit(side);
    (id << REQUEST_TYPE_BITS) | ty
}

fn construct_response_id(ty: u64, success: bool, id: u64) -> u64 {
    let id = id << RESPONSE_SUCCESS_BITS;
    let id = id | (success as u64);
    (id << RESPONSE_TYPE_BITS) | ty
}

fn extract_request_type(tagged: u64) -> u64 {
    extract_bits(tagged, REQUEST_TYPE_BITS, 0)
}

fn extract_request_side(tagged: u64) -> Side {
    side_from_bit(extract_bits(tagged, REQUEST_SIDE_BITS, REQUEST_TYPE_BITS))
}

fn extract_request_logical_id(tagged: u64) -> u64 {
    discard_bits(tagged, REQUEST_TYPE_BITS + REQUEST_SIDE_BITS)
}

fn extract_response_type(tagged: u64) -> u64 {
    extract_bits(tagged, RESPONSE_TYPE_BITS, 0)
}

fn extract_response_success(tagged: u64) -> bool {
    extract_bits(tagged, RESPONSE_SUCCESS_BITS, RESPONSE_TYPE_BITS) != 0
}

fn extract_response_logical_id(tagged: u64) -> u64 {
    discard_bits(tagged, RESPONSE_TYPE_BITS + RESPONSE_SUCCESS_BITS)
}

/// A decoded request frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Place {
        side: Side,
        id: u64,
        price: u32,
        quantity: u32,
    },
    Cancel {
        side: Side,
        id: u64,
    },
    Flush,
}

impl Request {
    /// Encode this request into its wire form, returning the number of
    /// bytes written into `out` (which must be at least
    /// [`MAX_REQUEST_FRAME_LEN`] long).
    pub fn encode(&self, out: &mut [u8]) -> usize {
        match *self {
            Request::Place {
                side,
                id,
                price,
                quantity,
            } => {
                let tagged = construct_request_id(REQUEST_TYPE_PLACE, side, id);
                out[0..8].copy_from_slice(&tagged.to_le_bytes());
                out[8..12].copy_from_slice(&price.to_le_bytes());
                out[12..16].copy_from_slice(&quantity.to_le_bytes());
                16
            }
            Request::Cancel { side, id } => {
                let tagged = construct_request_id(REQUEST_TYPE_CANCEL, side, id);
                out[0..8].copy_from_slice(&tagged.to_le_bytes());
                8
            }
            Request::Flush => {
                let tagged = REQUEST_TYPE_FLUSH;
                out[0..8].copy_from_slice(&tagged.to_le_bytes());
                8
            }
        }
    }

    /// Decode the frame type from an 8-byte header already read off the
    /// wire, without yet knowing how many further bytes to read.
    pub fn peek_type(header: &[u8; HEADER_LEN]) -> Option<RequestType> {
        let tagged = u64::from_le_bytes(*header);
        match extract_request_type(tagged) {
            REQUEST_TYPE_PLACE => Some(RequestType::Place),
            REQUEST_TYPE_CANCEL => Some(RequestType::Cancel),
            REQUEST_TYPE_FLUSH => Some(RequestType::Flush),
            _ => None,
        }
    }

    /// Finish decoding a `Place` request given its header and the 8
    /// trailing payload bytes (`price` then `quantity`).
    pub fn decode_place(header: &[u8; HEADER_LEN], payload: &[u8; 8]) -> Self {
        let tagged = u64::from_le_bytes(*header);
        Request::Place {
            side: extract_request_side(tagged),
            id: extract_request_logical_id(tagged),
            price: u32::from_le_bytes(payload[0..4].try_into().unwrap()),
            quantity: u32::from_le_bytes(payload[4..8].try_into().unwrap()),
        }
    }

    /// Finish decoding a `Cancel` request given only its header (a `Cancel`
    /// carries no further payload bytes).
    pub fn decode_cancel(header: &[u8; HEADER_LEN]) -> Self {
        let tagged = u64::from_le_bytes(*header);
        Request::Cancel {
            side: extract_request_side(tagged),
            id: extract_request_logical_id(tagged),
        }
    }
}

/// The request types a header byte/word can discriminate between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    Place,
    Cancel,
    Flush,
}

impl RequestType {
    /// Number of payload bytes that follow the header for this type.
    pub fn payload_len(self) -> usize {
        match self {
            RequestType::Place => 8,
            RequestType::Cancel => 0,
            RequestType::Flush => 0,
        }
    }
}

/// A decoded response frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Place {
        success: bool,
        id: u64,
    },
    Cancel {
        success: bool,
        id: u64,
    },
    Match {
        buy_id: u64,
        sell_id: u64,
        price: u32,
        quantity: u32,
        top_buy_price: u32,
        top_sell_price: u32,
    },
}

impl Response {
    pub fn encode(&self, out: &mut [u8]) -> usize {
        match *self {
            Response::Place { success, id } => {
                let tagged = construct_response_id(RESPONSE_TYPE_PLACE, success, id);
                out[0..8].copy_from_slice(&tagged.to_le_bytes());
                8
            }
            Response::Cancel { success, id } => {
                let tagged = construct_response_id(RESPONSE_TYPE_CANCEL, success, id);
                out[0..8].copy_from_slice(&tagged.to_le_bytes());
                8
            }
            Response::Match {
                buy_id,
                sell_id,
                price,
                quantity,
                top_buy_price,
                top_sell_price,
            } => {
                let tagged = construct_response_id(RESPONSE_TYPE_MATCH, true, buy_id);
                out[0..8].copy_from_slice(&tagged.to_le_bytes());
                out[8..16].copy_from_slice(&sell_id.to_le_bytes());
                out[16..20].copy_from_slice(&price.to_le_bytes());
                out[20..24].copy_from_slice(&quantity.to_le_bytes());
                out[24..28].copy_from_slice(&top_buy_price.to_le_bytes());
                out[28..32].copy_from_slice(&top_sell_price.to_le_bytes());
                32
            }
        }
    }

    pub fn peek_type(header: &[u8; HEADER_LEN]) -> Option<ResponseType> {
        let tagged = u64::from_le_bytes(*header);
        match extract_response_type(tagged) {
            RESPONSE_TYPE_PLACE => Some(ResponseType::Place),
            RESPONSE_TYPE_CANCEL => Some(ResponseType::Cancel),
            RESPONSE_TYPE_MATCH => Some(ResponseType::Match),
            _ => None,
        }
    }

    pub fn decode_place(header: &[u8; HEADER_LEN]) -> Self {
        let tagged = u64::from_le_bytes(*header);
        Response::Place {
            success: extract_response_success(tagged),
            id: extract_response_logical_id(tagged),
        }
    }

    pub fn decode_cancel(header: &[u8; HEADER_LEN]) -> Self {
        let tagged = u64::from_le_bytes(*header);
        Response::Cancel {
            success: extract_response_success(tagged),
            id: extract_response_logical_id(tagged),
        }
    }

    pub fn decode_match(header: &[u8; HEADER_LEN], payload: &[u8; 24]) -> Self {
        let tagged = u64::from_le_bytes(*header);
        Response::Match {
            buy_id: extract_response_logical_id(tagged),
            sell_id: u64::from_le_bytes(payload[0..8].try_into().unwrap()),
            price: u32::from_le_bytes(payload[8..12].try_into().unwrap()),
            quantity: u32::from_le_bytes(payload[12..16].try_into().unwrap()),
            top_buy_price: u32::from_le_bytes(payload[16..20].try_into().unwrap()),
            top_sell_price: u32::from_le_bytes(payload[20..24].try_into().unwrap()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    Place,
    Cancel,
    Match,
}

impl ResponseType {
    pub fn payload_len(self) -> usize {
        match self {
            ResponseType::Place => 0,
            ResponseType::Cancel => 0,
            ResponseType::Match => 24,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn side_from_bool(b: bool) -> Side {
        if b { Side::Sell } else { Side::Buy }
    }

    #[test]
    fn place_request_round_trips() {
        let req = Request::Place {
            side: Side::Buy,
            id: 42,
            price: 1000,
            quantity: 7,
        };
        let mut buf = [0u8; MAX_REQUEST_FRAME_LEN];
        let n = req.encode(&mut buf);
        assert_eq!(n, 16);
        let header: [u8; HEADER_LEN] = buf[0..8].try_into().unwrap();
        assert_eq!(Request::peek_type(&header), Some(RequestType::Place));
        let payload: [u8; 8] = buf[8..16].try_into().unwrap();
        assert_eq!(Request::decode_place(&header, &payload), req);
    }

    #[test]
    fn cancel_request_round_trips() {
        let req = Request::Cancel {
            side: Side::Sell,
            id: 9001,
        };
        let mut buf = [0u8; MAX_REQUEST_FRAME_LEN];
        req.encode(&mut buf);
        let header: [u8; HEADER_LEN] = buf[0..8].try_into().unwrap();
        assert_eq!(Request::peek_type(&header), Some(RequestType::Cancel));
        assert_eq!(Request::decode_cancel(&header), req);
    }

    #[test]
    fn flush_request_ignores_side() {
        let mut buf = [0u8; MAX_REQUEST_FRAME_LEN];
        Request::Flush.encode(&mut buf);
        let header: [u8; HEADER_LEN] = buf[0..8].try_into().unwrap();
        assert_eq!(Request::peek_type(&header), Some(RequestType::Flush));
    }

    #[test]
    fn match_response_round_trips() {
        let resp = Response::Match {
            buy_id: 1,
            sell_id: 2,
            price: 100,
            quantity: 5,
            top_buy_price: 200,
            top_sell_price: 50,
        };
        let mut buf = [0u8; MAX_RESPONSE_FRAME_LEN];
        let n = resp.encode(&mut buf);
        assert_eq!(n, 32);
        let header: [u8; HEADER_LEN] = buf[0..8].try_into().unwrap();
        assert_eq!(Response::peek_type(&header), Some(ResponseType::Match));
        let payload: [u8; 24] = buf[8..32].try_into().unwrap();
        assert_eq!(Response::decode_match(&header, &payload), resp);
    }

    proptest! {
        #[test]
        fn place_round_trip_property(
            side_is_sell in any::<bool>(),
            id in 0u64..(1u64 << 61),
            price in any::<u32>(),
            quantity in any::<u32>(),
        ) {
            let req = Request::Place { side: side_from_bool(side_is_sell), id, price, quantity };
            let mut buf = [0u8; MAX_REQUEST_FRAME_LEN];
            req.encode(&mut buf);
            let header: [u8; HEADER_LEN] = buf[0..8].try_into().unwrap();
            let payload: [u8; 8] = buf[8..16].try_into().unwrap();
            prop_assert_eq!(Request::decode_place(&header, &payload), req);
        }

        #[test]
        fn cancel_round_trip_property(
            side_is_sell in any::<bool>(),
            id in 0u64..(1u64 << 61),
        ) {
            let req = Request::Cancel { side: side_from_bool(side_is_sell), id };
            let mut buf = [0u8; MAX_REQUEST_FRAME_LEN];
            req.encode(&mut buf);
            let header: [u8; HEADER_LEN] = buf[0..8].try_into().unwrap();
            prop_assert_eq!(Request::decode_cancel(&header), req);
        }
    }
}
