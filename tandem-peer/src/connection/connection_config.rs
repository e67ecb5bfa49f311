use tandem_core::IceServerConfig;
use tandem_core::utils::default_ice_servers;

/// Fixed configuration every connection handle of a session is built from.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl ConnectionConfig {
    /// Defaults plus an optional TURN server, the way the demo deployments
    /// pass it through the environment.
    pub fn with_turn(
        url: Option<String>,
        username: Option<String>,
        credential: Option<String>,
    ) -> Self {
        let mut config = Self::default();
        if let Some(url) = url {
            config.ice_servers.push(IceServerConfig {
                urls: vec![url],
                username,
                credential,
            });
        }
        config
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            ice_servers: default_ice_servers(),
        }
    }
}
