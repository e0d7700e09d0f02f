use std::sync::Arc;

use bch_facilitator::adapters::{
    Adapters, EcdsaSignatureVerifier, EsploraChainClient, HttpFacilitatorWallet,
};
use bch_facilitator::api::server;
use bch_facilitator::config::FacilitatorConfig;
use bch_facilitator::ledger::locks::KeyedLocks;
use bch_facilitator::storage::FileLedgerStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = FacilitatorConfig::from_env();
    log::info!("Starting BCH payment facilitator on port {}", config.port);

    let chain_client = Arc::new(EsploraChainClient::new(
        config.bch_server_url.clone(),
        config.server_bch_address.clone(),
    ));
    let wallet_address = config
        .server_bch_address
        .clone()
        .unwrap_or_default();

    let adapters = Adapters {
        store: Arc::new(FileLedgerStore::new("./data")),
        chain_client: chain_client.clone(),
        signature_verifier: Arc::new(EcdsaSignatureVerifier::new(bitcoin::Network::Bitcoin)),
        wallet: Arc::new(HttpFacilitatorWallet::new(chain_client, wallet_address)),
        locks: Arc::new(KeyedLocks::new()),
    };

    server::start_server(config, adapters).await
}
