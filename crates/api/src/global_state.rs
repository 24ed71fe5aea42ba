use std::sync::Arc;

use anyhow::Result;
use tavern_common::ModuleClient;
use tavern_database::{PostgresClient, Repository};

#[derive(Clone)]
pub struct GlobalState {
    pub repo: Arc<dyn Repository>,
}

impl GlobalState {
    pub async fn new() -> Result<Self> {
        let pg = PostgresClient::setup_connection().await;
        let repo: Arc<dyn Repository> = pg.get_client().clone();
        Ok(Self { repo })
    }

    /// For tests and local development on a non-Postgres repository.
    pub fn with_repository(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }
}
