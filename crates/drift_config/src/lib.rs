//! drift_config
//!
//! Layered configuration for the Drift server: built-in defaults, an
//! optional `config/default` file, and environment variables (e.g.
//! `SERVER__PORT=8080`), merged in that order.

pub mod settings;

use crate::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{BrokerSettings, ServerSettings, Settings};

pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(Environment::default().separator("__"));

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;
    let default = Settings::default();

    Ok(Settings {
        server: ServerSettings {
            host: partial
                .server
                .as_ref()
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: partial
                .server
                .as_ref()
                .and_then(|s| s.port)
                .unwrap_or(default.server.port),
        },
        broker: BrokerSettings {
            history_len: partial
                .broker
                .as_ref()
                .and_then(|b| b.history_len)
                .unwrap_or(default.broker.history_len),
        },
    })
}
