use std::fmt::{self, Display};
use std::str::FromStr;

use rand::{distributions::Alphanumeric, thread_rng, Rng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The fixed length of a room code.
pub const ROOM_CODE_LENGTH: usize = 6;

/// A short, human-shareable room identifier.
///
/// Always exactly [ROOM_CODE_LENGTH] ASCII alphanumeric characters, stored
/// uppercase so lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("room codes are exactly {ROOM_CODE_LENGTH} alphanumeric characters")]
pub struct InvalidRoomCode;

impl RoomCode {
    pub fn new(raw: &str) -> Result<Self, InvalidRoomCode> {
        let raw = raw.trim();

        let valid = raw.len() == ROOM_CODE_LENGTH && raw.chars().all(|c| c.is_ascii_alphanumeric());

        if !valid {
            return Err(InvalidRoomCode);
        }

        Ok(Self(raw.to_ascii_uppercase()))
    }

    /// Creates a random code for a new room.
    pub fn generate() -> Self {
        let mut rng = thread_rng();

        let raw: String = std::iter::repeat(())
            .map(|_| rng.sample(Alphanumeric) as char)
            .take(ROOM_CODE_LENGTH)
            .collect();

        Self(raw.to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RoomCode {
    type Err = InvalidRoomCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RoomCode {
    type Error = InvalidRoomCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<RoomCode> for String {
    fn from(value: RoomCode) -> Self {
        value.0
    }
}

impl Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
