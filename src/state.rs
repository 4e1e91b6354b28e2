use std::sync::Arc;

use crate::archive::Archiver;
use crate::config::Config;
use crate::preview::{build_client, Identity, ImageValidator, PageFetcher, PreviewEngine};

/// Shared application state passed to all handlers.
/// Everything here is read-only after startup; requests share nothing mutable.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<PreviewEngine>,
    pub archiver: Arc<Archiver>,
    pub block_private_hosts: bool,
}

impl AppState {
    pub fn from_config(config: &Config) -> reqwest::Result<Self> {
        let client = build_client(config.block_private_hosts)?;
        let engine = PreviewEngine::new(
            PageFetcher::new(client.clone()),
            ImageValidator::new(
                client,
                config.image_policy.clone(),
                config.block_private_hosts,
            ),
            Identity::default_rotation(),
            config.placeholder_hosts.clone(),
        );
        let archiver = Archiver::new(
            config.archive_command.clone(),
            config.archive_args.clone(),
            config.archive_timeout,
        );

        Ok(AppState {
            engine: Arc::new(engine),
            archiver: Arc::new(archiver),
            block_private_hosts: config.block_private_hosts,
        })
    }
}
