use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side yields when both endpoints offer at once.
///
/// The endpoint already in the room turns polite when it hears the newcomer
/// arrive. The newcomer never hears its own arrival and keeps the default.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerRole {
    Polite,
    #[default]
    Impolite,
}

impl PeerRole {
    pub fn is_polite(self) -> bool {
        matches!(self, Self::Polite)
    }
}

impl fmt::Display for PeerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Polite => f.write_str("polite"),
            Self::Impolite => f.write_str("impolite"),
        }
    }
}
