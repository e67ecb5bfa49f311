use crate::model::IceServerConfig;

pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_2: &str = "stun:stun1.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_3: &str = "stun:stun2.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_4: &str = "stun:stun3.l.google.com:19302";

/// Label of the chat channel both sides open out-of-band.
pub const CHAT_CHANNEL_LABEL: &str = "chat";

/// Stream id both sides agree on for the negotiated chat channel.
pub const CHAT_CHANNEL_ID: u16 = 50;

/// Public STUN servers used when nothing else is configured.
pub fn default_ice_servers() -> Vec<IceServerConfig> {
    vec![IceServerConfig {
        urls: vec![
            DEFAULT_STUN_ADDR.to_owned(),
            DEFAULT_STUN_ADDR_2.to_owned(),
            DEFAULT_STUN_ADDR_3.to_owned(),
            DEFAULT_STUN_ADDR_4.to_owned(),
        ],
        username: None,
        credential: None,
    }]
}
