//! JSON API routes.

use axum::{Json, extract::State};
use farmhouse_core::catalog::Catalog;
use tracing::instrument;

use crate::error::Result;
use crate::state::AppState;

/// The catalog with the site's sold-out state applied.
///
/// Answers 502 when the catalog cannot be loaded and the fallback policy is
/// `error`.
#[instrument(skip(state))]
pub async fn catalog(State(state): State<AppState>) -> Result<Json<Catalog>> {
    let site = state.site_config();
    let catalog = state.catalog().load_with_overlay(&site).await?;
    Ok(Json(catalog))
}
