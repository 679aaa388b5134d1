use crate::config::Config;
use ilo_client::{ClientOptions, Credentials};
use ilo_collector::Scraper;
use std::sync::Arc;

/// Shared, read-only state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub scraper: Arc<Scraper>,
    pub client_options: Arc<ClientOptions>,
    pub credentials: Arc<Credentials>,
}

impl AppState {
    pub fn new(config: Arc<Config>) -> Self {
        Self::with_scraper(config, Scraper::with_default_collectors())
    }

    pub fn with_scraper(config: Arc<Config>, scraper: Scraper) -> Self {
        Self {
            client_options: Arc::new(config.api.client_options()),
            credentials: Arc::new(config.api.credentials()),
            scraper: Arc::new(scraper),
            config,
        }
    }
}
