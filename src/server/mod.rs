//! JSON API over the aggregation views and the run ledger.
//!
//! Every aggregation endpoint is a thin wrapper around [`QueryService`];
//! nothing is cached between requests.

mod handlers;
mod routes;

pub use routes::create_router;

use std::sync::Arc;

use crate::config::Settings;
use crate::query::QueryService;
use crate::repository::{ArticleRepository, DbContext, RunLedger};

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub queries: Arc<QueryService<ArticleRepository>>,
    pub runs: Arc<RunLedger>,
    /// Window applied when a request has no start date.
    pub default_window_days: u32,
}

impl AppState {
    pub fn from_context(ctx: &DbContext, default_window_days: u32) -> Self {
        Self {
            queries: Arc::new(QueryService::new(ctx.articles())),
            runs: Arc::new(ctx.runs()),
            default_window_days,
        }
    }

    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        let ctx = settings.create_db_context();
        ctx.init_schema().await?;
        Ok(Self::from_context(&ctx, settings.default_window_days))
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings, bind: &str) -> anyhow::Result<()> {
    let state = AppState::new(settings).await?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("Starting server at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
