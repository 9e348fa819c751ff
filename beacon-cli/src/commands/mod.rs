pub mod completion;
pub mod list;
pub mod mark_read;
pub mod watch;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use cli::{HttpApi, SharedApi};
use shared::config::{client::ClientConfig, server::Config};
use url::Url;
use uuid::Uuid;

/// Connection flags shared by every networked subcommand.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Beacon server base URL (default: <http://localhost:8080>, or `BEACON_SERVER_URL`)
    #[arg(long, global = true)]
    pub server: Option<Url>,

    /// Principal to act as (default: `BEACON_PRINCIPAL_ID` or `client.principal_id`)
    #[arg(long, global = true)]
    pub principal: Option<Uuid>,

    /// Configuration file whose `client` section supplies the defaults
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,
}

/// Resolved client settings plus the API they point at.
pub struct Connection {
    pub config: ClientConfig,
    pub api: SharedApi,
}

impl ConnectionArgs {
    pub fn connect(&self) -> Result<Connection> {
        let mut config = Config::load_config(self.config.clone(), None)
            .context("failed to load configuration")?
            .client;
        if let Some(server) = &self.server {
            config.server_url = server.clone();
        }
        if let Some(principal) = self.principal {
            config.principal_id = Some(principal);
        }

        let principal_id = config
            .principal_id
            .context("no principal configured; pass --principal or set BEACON_PRINCIPAL_ID")?;
        let api = HttpApi::new(config.server_url.clone(), principal_id)
            .context("failed to build HTTP client")?;

        Ok(Connection {
            config,
            api: Arc::new(api),
        })
    }
}
