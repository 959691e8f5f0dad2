//! Random join codes.

use keyrace_protocol::RoomCode;
use rand::Rng;

/// Draws a code of [`RoomCode::LEN`] characters uniformly from the base-36
/// alphabet.
pub fn random_code<R: Rng + ?Sized>(rng: &mut R) -> RoomCode {
    let raw: String = (0..RoomCode::LEN)
        .map(|_| char::from(RoomCode::ALPHABET[rng.random_range(0..RoomCode::ALPHABET.len())]))
        .collect();
    match RoomCode::parse(&raw) {
        Ok(code) => code,
        // Every alphabet character is an uppercase ASCII alphanumeric.
        Err(_) => unreachable!("generated code {raw} is always valid"),
    }
}
