/// Facilitator configuration from environment variables
///
/// Controls the HTTP surface, the facilitator's own receiving address, and
/// where the on-chain node client lives.
use std::env;

#[derive(Clone, Debug)]
pub struct FacilitatorConfig {
    /// HTTP listen port.
    pub port: u16,
    /// Deployment environment tag, e.g. "production", "development".
    pub node_env: String,
    /// `log`/`env_logger` filter level.
    pub log_level: String,
    /// This facilitator's own receiving address on the native chain. Every
    /// accepted UTXO must pay this address. Required outside development.
    pub server_bch_address: Option<String>,
    /// Which HTTP surface to expose.
    pub api_type: ApiType,
    /// Base URL of the on-chain node client.
    pub bch_server_url: String,
    /// Optional bearer token gating the `/settle` endpoint.
    pub bearer_token: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiType {
    ConsumerApi,
    RestApi,
}

impl FacilitatorConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `PORT`: HTTP listen port (default 4345)
    /// - `NODE_ENV`: deployment environment (default "development")
    /// - `LOG_LEVEL`: log filter level (default "info")
    /// - `SERVER_BCH_ADDRESS`: this facilitator's receiving address (required in production)
    /// - `API_TYPE`: "consumer-api" (default) or "rest-api"
    /// - `BCH_SERVER_URL`: chain node client base URL
    /// - `BEARER_TOKEN`: optional bearer token for `/settle`
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(4345);
        log::info!("🔌 HTTP port: {}", port);

        let node_env = env::var("NODE_ENV").unwrap_or_else(|_| "development".to_string());
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let server_bch_address = env::var("SERVER_BCH_ADDRESS").ok();
        match &server_bch_address {
            Some(addr) => log::info!("💰 Server BCH address: {}", addr),
            None if node_env == "production" => {
                panic!(
                    "SERVER_BCH_ADDRESS must be set in production: the facilitator cannot \
                     validate receiver addresses without its own address configured"
                );
            }
            None => log::warn!("⚠️  SERVER_BCH_ADDRESS not set; running without a configured server address"),
        }

        let api_type = match env::var("API_TYPE").as_deref() {
            Ok("rest-api") => ApiType::RestApi,
            _ => ApiType::ConsumerApi,
        };

        let bch_server_url =
            env::var("BCH_SERVER_URL").unwrap_or_else(|_| "http://localhost:8332".to_string());
        log::info!("📡 Chain node client URL: {}", bch_server_url);

        let bearer_token = env::var("BEARER_TOKEN").ok();

        Self {
            port,
            node_env,
            log_level,
            server_bch_address,
            api_type,
            bch_server_url,
            bearer_token,
        }
    }
}

impl Default for FacilitatorConfig {
    /// Default configuration (development, consumer API)
    fn default() -> Self {
        Self {
            port: 4345,
            node_env: "development".to_string(),
            log_level: "info".to_string(),
            server_bch_address: None,
            api_type: ApiType::ConsumerApi,
            bch_server_url: "http://localhost:8332".to_string(),
            bearer_token: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_uses_consumer_api_and_standard_port() {
        let config = FacilitatorConfig::default();
        assert_eq!(config.port, 4345);
        assert_eq!(config.api_type, ApiType::ConsumerApi);
        assert!(config.server_bch_address.is_none());
    }
}
