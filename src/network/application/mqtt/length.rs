//! The MQTT "Remaining Length" variable-byte integer.
//!
//! Each encoded byte carries seven bits of the value, least significant group
//! first. Bit 7 is set when another byte follows. Four bytes cover
//! `0..=268_435_455`, the largest length MQTT 3.1.1 allows.

use crate::network::error::Error;
use heapless::Vec;

/// Largest value representable in four encoded bytes.
pub const MAX_REMAINING_LENGTH: u32 = 268_435_455;

/// Maximum number of wire bytes a Remaining Length can occupy.
pub const MAX_ENCODED_LEN: usize = 4;

/// Encode `value` as a Remaining Length.
///
/// The first byte of the result is the number of encoded bytes that follow
/// (1 to 4); the wire form is therefore `&encoded[1..]`. Zero encodes to a
/// single `0x00` byte, never to an empty sequence.
///
/// # Errors
///
/// [`Error::EncodingOverflow`] if `value` exceeds [`MAX_REMAINING_LENGTH`].
///
/// # Examples
///
/// ```rust
/// use libmqtt::network::application::mqtt::length::encode_remaining_length;
///
/// assert_eq!(&encode_remaining_length(0).unwrap()[..], &[1, 0x00]);
/// assert_eq!(&encode_remaining_length(321).unwrap()[..], &[2, 0xC1, 0x02]);
/// ```
pub fn encode_remaining_length(mut value: u32) -> Result<Vec<u8, 5>, Error> {
    if value > MAX_REMAINING_LENGTH {
        return Err(Error::EncodingOverflow);
    }

    let mut encoded: Vec<u8, 5> = Vec::new();
    encoded.push(0).map_err(|_| Error::EncodingOverflow)?;
    loop {
        let mut byte = (value % 128) as u8;
        value /= 128;
        if value > 0 {
            byte |= 0x80;
        }
        encoded.push(byte).map_err(|_| Error::EncodingOverflow)?;
        if value == 0 {
            break;
        }
    }
    encoded[0] = (encoded.len() - 1) as u8;
    Ok(encoded)
}

/// Decode a Remaining Length from the start of `wire`.
///
/// Returns the value and the number of bytes it occupied.
///
/// # Errors
///
/// [`Error::MalformedInboundPacket`] when `wire` ends before the final byte or
/// when a fourth byte still has its continuation bit set.
pub fn decode_remaining_length(wire: &[u8]) -> Result<(u32, usize), Error> {
    let mut value: u32 = 0;
    let mut multiplier: u32 = 1;

    for (i, byte) in wire.iter().take(MAX_ENCODED_LEN).enumerate() {
        value += u32::from(byte & 0x7F) * multiplier;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        multiplier *= 128;
    }

    Err(Error::MalformedInboundPacket)
}
