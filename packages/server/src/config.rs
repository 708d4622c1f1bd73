use std::env;
use std::net::SocketAddr;

use carpecarb_lookup::LookupConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub lookup: LookupConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let bind = env::var("CARPECARB_BIND")
            .ok()
            .and_then(|v| match v.parse() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    tracing::warn!(value = %v, error = %e, "invalid CARPECARB_BIND, using default");
                    None
                }
            })
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8000)));

        let lookup = LookupConfig::from_env();

        if lookup.api_key.trim().is_empty() {
            tracing::warn!("PERPLEXITY_API_KEY is not set; lookups will fail until it is");
        }

        Self { bind, lookup }
    }
}
