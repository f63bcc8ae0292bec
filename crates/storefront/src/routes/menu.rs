//! Menu page route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, State};
use farmhouse_core::catalog::Category;
use tracing::instrument;

use crate::catalog::{ProductCard, render};
use crate::error::AppError;
use crate::state::AppState;

/// A menu filter tab.
#[derive(Clone)]
pub struct CategoryTab {
    pub slug: String,
    pub label: String,
    pub active: bool,
}

/// Menu page template.
#[derive(Template, WebTemplate)]
#[template(path = "menu.html")]
pub struct MenuTemplate {
    pub tabs: Vec<CategoryTab>,
    pub heading: String,
    pub cards: Vec<ProductCard>,
    /// Shown instead of the products when the catalog could not be loaded.
    pub error: Option<String>,
    pub orders_paused: bool,
}

fn tabs(active: Option<&Category>) -> Vec<CategoryTab> {
    std::iter::once(CategoryTab {
        slug: String::new(),
        label: "All".to_string(),
        active: active.is_none(),
    })
    .chain(Category::MENU.iter().map(|c| CategoryTab {
        slug: c.as_str().to_string(),
        label: c.label(),
        active: active == Some(c),
    }))
    .collect()
}

async fn render_menu(state: &AppState, category: Option<Category>) -> MenuTemplate {
    let site = state.site_config();
    let heading = category
        .as_ref()
        .map_or_else(|| "Our Menu".to_string(), Category::label);

    let (cards, error) = match state.catalog().load_with_overlay(&site).await {
        Ok(catalog) => (render(&catalog, category.as_ref()), None),
        Err(e) => (Vec::new(), Some(AppError::from(e).public_message())),
    };

    MenuTemplate {
        tabs: tabs(category.as_ref()),
        heading,
        cards,
        error,
        orders_paused: site.orders_paused(),
    }
}

/// Display the full menu.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> MenuTemplate {
    render_menu(&state, None).await
}

/// Display one category of the menu.
#[instrument(skip(state))]
pub async fn category(State(state): State<AppState>, Path(slug): Path<String>) -> MenuTemplate {
    render_menu(&state, Some(Category::from(slug))).await
}
