use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

const ROOM_ID_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomIdError {
    #[error("room id must be exactly {ROOM_ID_LEN} digits, got {0:?}")]
    Malformed(String),
}

/// Six-digit numeric room name shared by both endpoints and the relay.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(String);

impl RoomId {
    /// Fresh random room name.
    pub fn new() -> Self {
        let n = Uuid::new_v4().as_u128() % 10u128.pow(ROOM_ID_LEN as u32);
        Self(format!("{n:0width$}", width = ROOM_ID_LEN))
    }

    /// Resolve a user-supplied fragment such as `#123456`. Anything that is
    /// not a well-formed room name yields a freshly generated one; the flag
    /// tells the caller which happened.
    pub fn from_fragment(fragment: Option<&str>) -> (Self, bool) {
        let existing = fragment
            .map(|f| f.trim_start_matches('#'))
            .and_then(|f| f.parse::<RoomId>().ok());

        match existing {
            Some(id) => (id, false),
            None => (Self::new(), true),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for RoomId {
    type Err = RoomIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == ROOM_ID_LEN && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(s.to_owned()))
        } else {
            Err(RoomIdError::Malformed(s.to_owned()))
        }
    }
}

impl TryFrom<String> for RoomId {
    type Error = RoomIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RoomId> for String {
    fn from(value: RoomId) -> Self {
        value.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
