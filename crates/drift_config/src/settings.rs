use serde::Deserialize;

/// Top-level configuration for the Drift server.
///
/// Aggregates the network parameters for the HTTP listener and the
/// operational parameters for the broker.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Configuration for the HTTP server: bind address and port.
    pub server: ServerSettings,
    /// Configuration for the broker: history retention.
    pub broker: BrokerSettings,
}

/// Network parameters for the HTTP listener.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    /// The host address (e.g. "127.0.0.1" or "0.0.0.0") to bind to.
    pub host: String,
    /// The port number to listen on.
    pub port: u16,
}

/// Operational parameters for the broker.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    /// How many messages a topic's history ring retains. Applied when a
    /// topic is created; existing topics keep their capacity.
    pub history_len: usize,
}

/// Partial configuration loaded from files or the environment.
///
/// Every value is optional; missing values fall back to defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
}

/// Partial server settings.
#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Partial broker settings.
#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub history_len: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 5500,
            },
            broker: BrokerSettings { history_len: 1000 },
        }
    }
}
