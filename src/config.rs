use std::net::{IpAddr, SocketAddr};

use serde::Deserialize;

/// Runtime settings, read from an optional `academy.toml` and then the
/// environment (`PORT`, `DATABASE_URL`, ...), the latter taking precedence.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub port: u16,
    pub bind_address: IpAddr,
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Settings {
    pub fn load() -> Result<Self, config::ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_source(config::Environment::default().try_parsing(true))
    }

    fn from_source<S>(source: S) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        config::Config::builder()
            .set_default("port", 3001)?
            .set_default("bind_address", "0.0.0.0")?
            .set_default("max_connections", 10)?
            .set_default("acquire_timeout_secs", 5)?
            .add_source(config::File::with_name("academy").required(false))
            .add_source(source)
            .build()?
            .try_deserialize()
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}
