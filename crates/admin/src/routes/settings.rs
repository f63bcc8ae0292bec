//! Site configuration route handlers.
//!
//! These write the shared file store the storefront reads on every request,
//! so a change is live as soon as the redirect lands.

use axum::{Form, extract::State, response::Redirect};
use farmhouse_core::ProductId;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::editor::set_flash;
use crate::editor::checkbox;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

/// Orders switch form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OrdersForm {
    #[serde(deserialize_with = "checkbox")]
    pub paused: bool,
}

/// Sold-out toggle form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SoldOutForm {
    pub product_id: String,
    #[serde(deserialize_with = "checkbox")]
    pub sold_out: bool,
}

/// Pause or resume ordering.
///
/// POST /settings/orders
#[instrument(skip_all)]
pub async fn orders(
    _auth: RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<OrdersForm>,
) -> Result<Redirect> {
    state.update_site_config(|config| config.pause_orders(form.paused))?;
    tracing::info!(paused = form.paused, "Orders switch changed");

    let notice = if form.paused {
        "Orders are paused. The storefront no longer accepts orders."
    } else {
        "Orders are open."
    };
    set_flash(&session, notice).await?;
    Ok(Redirect::to("/#settings"))
}

/// Mark a product sold out or available.
///
/// POST /settings/sold-out
#[instrument(skip_all)]
pub async fn sold_out(
    _auth: RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SoldOutForm>,
) -> Result<Redirect> {
    let id = form.product_id.trim();
    if id.is_empty() {
        return Err(AppError::BadRequest("product_id is required".to_string()));
    }

    let id = ProductId::new(id);
    state.update_site_config(|config| config.set_sold_out(&id, form.sold_out))?;
    tracing::info!(product = %id, sold_out = form.sold_out, "Sold-out state changed");

    let status = if form.sold_out { "sold out" } else { "available" };
    set_flash(&session, format!("{id} is now {status}.")).await?;
    Ok(Redirect::to("/#settings"))
}

/// Restore the default site configuration.
///
/// POST /settings/reset
#[instrument(skip_all)]
pub async fn reset(
    _auth: RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<Redirect> {
    state.reset_site_config()?;
    set_flash(&session, "Site settings reset: orders open, nothing sold out.").await?;
    Ok(Redirect::to("/#settings"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_forms_parse_checkboxes() {
        let form: SoldOutForm = serde_json::from_value(serde_json::json!({
            "product_id": "pumpkin-pie",
            "sold_out": "true",
        }))
        .unwrap();
        assert_eq!(form.product_id, "pumpkin-pie");
        assert!(form.sold_out);

        let form: OrdersForm = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(!form.paused);
    }
}
