use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use genai_common::gemini::GeminiClientConfig;

use crate::error::AppError;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_BODY_LIMIT_BYTES: usize = 100 * 1024;

/// Process-wide configuration, read once at startup and shared by reference
/// with every handler.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    /// Directory holding `index.html` and any other files served as-is.
    pub static_dir: PathBuf,
    /// Upper bound on JSON request bodies.
    pub body_limit_bytes: usize,
    pub gemini: GeminiClientConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `HOST`: bind address (default `0.0.0.0`)
    /// - `PORT`: listen port (default `5000`)
    /// - `STATIC_DIR`: directory served at `/` (default `.`)
    /// - `BODY_LIMIT_BYTES`: maximum request body size (default 100 KiB)
    /// - `GEMINI_*`: see [`GeminiClientConfig::from_vars`]
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars<F>(var: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| {
            var(name)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let host = match non_empty("HOST") {
            Some(raw) => raw
                .parse::<IpAddr>()
                .map_err(|_| AppError::Config(format!("HOST is not a valid IP address: {raw}")))?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        let port = match non_empty("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| AppError::Config(format!("PORT is not a valid port number: {raw}")))?,
            None => DEFAULT_PORT,
        };

        let static_dir = non_empty("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let body_limit_bytes = match non_empty("BODY_LIMIT_BYTES") {
            Some(raw) => raw.parse::<usize>().map_err(|_| {
                AppError::Config(format!("BODY_LIMIT_BYTES is not a valid size: {raw}"))
            })?,
            None => DEFAULT_BODY_LIMIT_BYTES,
        };

        Ok(Self {
            host,
            port,
            static_dir,
            body_limit_bytes,
            gemini: GeminiClientConfig::from_vars(&var),
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn index_file(&self) -> PathBuf {
        self.static_dir.join("index.html")
    }
}
