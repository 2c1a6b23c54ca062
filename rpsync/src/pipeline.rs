//! Sync pipeline driver
//!
//! One linear pass, no branching and no retry:
//!
//! ```text
//! Start -> WatermarkResolved -> TokenAcquired -> Fetched -> Done
//!                  \________________\_______________\____-> Failed
//! ```
//!
//! The first error ends the run and is returned unchanged.

use crate::db::Storage;
use crate::error::SyncResult;
use crate::secrets::{resolve_credentials, EnvSecretStore, SpotifyCredentials, TomlSecretStore};
use crate::services::{latest_watermark, load, HistoryClient, TokenRefresher};
use rpsync_common::config::{InitialWatermark, TomlConfig};
use rpsync_common::db::play_events_table;
use std::fmt;
use std::path::Path;
use tracing::{error, info};

/// Stage reached by a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Start,
    WatermarkResolved,
    TokenAcquired,
    Fetched,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Start => "start",
            PipelineState::WatermarkResolved => "watermark_resolved",
            PipelineState::TokenAcquired => "token_acquired",
            PipelineState::Fetched => "fetched",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Cursor sent to the history endpoint
    pub watermark_ms: i64,
    /// Records returned by the history endpoint
    pub fetched: usize,
    /// Rows committed
    pub inserted: u64,
}

/// The stages of one sync pass, wired together
pub struct Pipeline {
    storage: Storage,
    refresher: TokenRefresher,
    history: HistoryClient,
    initial_watermark: InitialWatermark,
}

impl Pipeline {
    pub fn new(
        storage: Storage,
        refresher: TokenRefresher,
        history: HistoryClient,
        initial_watermark: InitialWatermark,
    ) -> Self {
        Self {
            storage,
            refresher,
            history,
            initial_watermark,
        }
    }

    /// Open the database and build the HTTP clients from config
    ///
    /// Creates the table if it does not exist yet.
    pub async fn from_config(config: &TomlConfig, db_path: &Path) -> SyncResult<Self> {
        let refresher = TokenRefresher::new(config.spotify.token_url.clone())?;
        let history = HistoryClient::new(&config.spotify.api_base_url, config.sync.fetch_error_policy)?;

        let storage = Storage::open(db_path, play_events_table(config.sync.deduplicate)).await?;
        if let Err(e) = storage.ensure_schema().await {
            storage.close().await;
            return Err(e.into());
        }

        Ok(Self::new(
            storage,
            refresher,
            history,
            config.sync.initial_watermark,
        ))
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Run one pass with already-resolved credentials
    pub async fn run(&self, credentials: &SpotifyCredentials) -> SyncResult<SyncReport> {
        let mut state = PipelineState::Start;

        let outcome = self.run_stages(credentials, &mut state).await;

        match &outcome {
            Ok(report) => info!(
                state = %PipelineState::Done,
                watermark = report.watermark_ms,
                fetched = report.fetched,
                inserted = report.inserted,
                "Sync run complete"
            ),
            Err(e) => error!(
                state = %PipelineState::Failed,
                reached = %state,
                error = %e,
                "Sync run failed"
            ),
        }

        outcome
    }

    async fn run_stages(
        &self,
        credentials: &SpotifyCredentials,
        state: &mut PipelineState,
    ) -> SyncResult<SyncReport> {
        let watermark_ms = latest_watermark(&self.storage, self.initial_watermark).await?;
        advance(state, PipelineState::WatermarkResolved);

        let access_token = self
            .refresher
            .refresh(
                &credentials.client_id,
                &credentials.client_secret,
                &credentials.refresh_token,
            )
            .await?;
        advance(state, PipelineState::TokenAcquired);

        let records = self.history.fetch_since(&access_token, watermark_ms).await?;
        advance(state, PipelineState::Fetched);

        let inserted = load(&self.storage, &records).await?;

        Ok(SyncReport {
            watermark_ms,
            fetched: records.len(),
            inserted,
        })
    }

    /// Release the database
    pub async fn close(self) {
        self.storage.close().await;
    }
}

fn advance(state: &mut PipelineState, next: PipelineState) {
    info!(from = %state, to = %next, "Pipeline state");
    *state = next;
}

/// Resolve secrets, run one pass, close the database
///
/// Secrets come from the environment first, then the TOML `[spotify]` table.
pub async fn sync_once(config: &TomlConfig, db_path: &Path) -> SyncResult<SyncReport> {
    let env_store = EnvSecretStore;
    let toml_store = TomlSecretStore::new(&config.spotify);
    let credentials = resolve_credentials(&[&env_store, &toml_store])?;

    let pipeline = Pipeline::from_config(config, db_path).await?;
    let outcome = pipeline.run(&credentials).await;
    pipeline.close().await;

    outcome
}
