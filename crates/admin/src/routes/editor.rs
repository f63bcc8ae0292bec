//! Catalog editor route handlers.
//!
//! Every handler works on the session's working copy. Successful edits
//! redirect back to the editor (post/redirect/get) with a flash notice;
//! rejected edits re-render the editor with the error and a 4xx status.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use farmhouse_core::catalog::{Catalog, Category, DietaryPricing, Product};
use farmhouse_core::site_config::SiteConfig;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::editor::{
    self, CatalogEditor, DOWNLOAD_FILENAME, EditorError, ProductPatch, WORKING_COPY_KEY,
    format_sizes, parse_price,
};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

/// Session key for the one-shot notice shown after a redirect.
const FLASH_KEY: &str = "admin_flash";

/// Form field carrying an image upload.
const IMAGE_FIELD: &str = "image";

// =============================================================================
// View models
// =============================================================================

/// One product as the editor form shows it.
pub struct ProductRow {
    pub index: usize,
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: String,
    pub ingredients: String,
    pub allergens: String,
    pub sizes: String,
    pub price: String,
    pub gluten_free: bool,
    pub sugar_free: bool,
    pub vegan: bool,
    pub shippable: bool,
    pub featured: bool,
    /// Image file name or URL; empty for an uploaded image.
    pub image: String,
    /// Inline preview of an uploaded image.
    pub preview: Option<String>,
    pub sold_out: bool,
}

impl ProductRow {
    fn new(index: usize, product: &Product, site: &SiteConfig) -> Self {
        let uploaded = product
            .image
            .as_deref()
            .filter(|i| i.starts_with("data:"))
            .map(String::from);
        Self {
            index,
            id: product.id.to_string(),
            name: product.name.clone(),
            category: product.category.as_str().to_string(),
            description: product.description.clone(),
            ingredients: product
                .ingredients
                .as_ref()
                .map(|t| t.display())
                .unwrap_or_default(),
            allergens: product
                .allergens
                .as_ref()
                .map(|t| t.display())
                .unwrap_or_default(),
            sizes: format_sizes(&product.sizes),
            price: product.price_display(),
            gluten_free: product.dietary.gluten_free,
            sugar_free: product.dietary.sugar_free,
            vegan: product.dietary.vegan,
            shippable: product.shippable,
            featured: product.featured,
            image: if uploaded.is_some() {
                String::new()
            } else {
                product.image.clone().unwrap_or_default()
            },
            preview: uploaded,
            sold_out: product.sold_out || site.is_sold_out(&product.id),
        }
    }
}

/// A category choice in the product form.
pub struct CategoryOption {
    pub value: String,
    pub label: String,
}

fn category_options(products: &[Product]) -> Vec<CategoryOption> {
    let mut options: Vec<CategoryOption> = Category::MENU
        .iter()
        .map(|c| CategoryOption {
            value: c.as_str().to_string(),
            label: c.label(),
        })
        .collect();

    // Keep categories the menu tabs don't know about selectable.
    for product in products {
        let value = product.category.as_str();
        if !options.iter().any(|o| o.value == value) {
            options.push(CategoryOption {
                value: value.to_string(),
                label: product.category.label(),
            });
        }
    }
    options
}

/// Dietary surcharges as form values.
pub struct PricingView {
    pub gluten_free: String,
    pub sugar_free: String,
    pub vegan: String,
}

impl From<&DietaryPricing> for PricingView {
    fn from(pricing: &DietaryPricing) -> Self {
        Self {
            gluten_free: pricing.gluten_free.plain(),
            sugar_free: pricing.sugar_free.plain(),
            vegan: pricing.vegan.plain(),
        }
    }
}

/// Editor page template.
#[derive(Template, WebTemplate)]
#[template(path = "editor.html")]
pub struct EditorTemplate {
    pub products: Vec<ProductRow>,
    pub categories: Vec<CategoryOption>,
    pub pricing: PricingView,
    pub issues: Vec<String>,
    pub dirty: bool,
    pub catalog_path: String,
    pub notice: Option<String>,
    pub error: Option<String>,
    pub orders_paused: bool,
    pub site_updated: String,
}

impl EditorTemplate {
    fn new(state: &AppState, editor: &CatalogEditor) -> Self {
        let site = state.site_config();
        let catalog = editor.catalog();
        Self {
            products: catalog
                .products
                .iter()
                .enumerate()
                .map(|(i, p)| ProductRow::new(i, p, &site))
                .collect(),
            categories: category_options(&catalog.products),
            pricing: PricingView::from(&catalog.dietary_pricing),
            issues: editor
                .validate()
                .into_iter()
                .map(|issue| format!("{}: {}", issue.product, issue.message))
                .collect(),
            dirty: editor.is_dirty(),
            catalog_path: state.config().catalog_path.display().to_string(),
            notice: None,
            error: None,
            orders_paused: site.orders_paused(),
            site_updated: site.last_updated.format("%Y-%m-%d %H:%M UTC").to_string(),
        }
    }
}

// =============================================================================
// Session helpers
// =============================================================================

/// The session's working copy, loading it from disk on first use.
///
/// When the catalog file cannot be read the editor starts empty and the
/// returned message explains why. The empty copy is not stored, so the next
/// request tries the file again.
async fn working_copy(
    state: &AppState,
    session: &Session,
) -> Result<(CatalogEditor, Option<String>)> {
    if let Some(editor) = session.get::<CatalogEditor>(WORKING_COPY_KEY).await? {
        return Ok((editor, None));
    }

    match CatalogEditor::load(&state.config().catalog_path).await {
        Ok(editor) => Ok((editor, None)),
        Err(e) => {
            tracing::warn!(error = %e, "Catalog unavailable, starting with an empty catalog");
            Ok((
                CatalogEditor::new(Catalog::empty()),
                Some(format!("{e}. Starting with an empty catalog.")),
            ))
        }
    }
}

async fn save(session: &Session, editor: &CatalogEditor) -> Result<()> {
    session.insert(WORKING_COPY_KEY, editor).await?;
    Ok(())
}

pub(crate) async fn set_flash(session: &Session, message: impl Into<String>) -> Result<()> {
    session.insert(FLASH_KEY, message.into()).await?;
    Ok(())
}

async fn take_flash(session: &Session) -> Result<Option<String>> {
    Ok(session.remove::<String>(FLASH_KEY).await?)
}

/// Save the working copy and redirect back to the editor.
async fn saved(
    session: &Session,
    editor: &CatalogEditor,
    notice: String,
    anchor: &str,
) -> Result<Response> {
    save(session, editor).await?;
    set_flash(session, notice).await?;
    Ok(Redirect::to(&format!("/{anchor}")).into_response())
}

/// Re-render the editor with a rejected edit.
///
/// Server-side faults go through [`AppError`] so their details stay in the
/// logs.
fn rejected(state: &AppState, editor: &CatalogEditor, err: EditorError) -> Response {
    let err = AppError::from(err);
    let status = err.status();
    if status.is_server_error() {
        return err.into_response();
    }

    tracing::info!(error = %err, "Edit rejected");
    let mut page = EditorTemplate::new(state, editor);
    page.error = Some(err.to_string());
    (status, page).into_response()
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the editor.
///
/// GET /
#[instrument(skip_all)]
pub async fn index(
    _auth: RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<EditorTemplate> {
    let (editor, load_error) = working_copy(&state, &session).await?;
    let mut page = EditorTemplate::new(&state, &editor);
    page.notice = take_flash(&session).await?;
    page.error = load_error;
    Ok(page)
}

/// Append a placeholder product.
///
/// POST /products/new
#[instrument(skip_all)]
pub async fn new_product(
    _auth: RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<Response> {
    let (mut editor, _) = working_copy(&state, &session).await?;
    let index = editor.add_product(Utc::now());
    tracing::info!(index, "Product added");
    let notice = "Added a new product. Fill in its details below.".to_string();
    saved(&session, &editor, notice, &format!("#product-{index}")).await
}

/// Apply the product form.
///
/// POST /products/{index}
#[instrument(skip_all)]
pub async fn update_product(
    _auth: RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(index): Path<usize>,
    Form(patch): Form<ProductPatch>,
) -> Result<Response> {
    let (mut editor, _) = working_copy(&state, &session).await?;
    match editor.update(index, patch) {
        Ok(()) => {
            let name = editor
                .products()
                .get(index)
                .map(|p| p.name.clone())
                .unwrap_or_default();
            let anchor = format!("#product-{index}");
            saved(&session, &editor, format!("Saved {name}."), &anchor).await
        }
        Err(e) => Ok(rejected(&state, &editor, e)),
    }
}

/// Delete confirmation form.
#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    #[serde(default)]
    pub confirm: String,
}

/// Remove a product. Requires `confirm=true`.
///
/// POST /products/{index}/delete
#[instrument(skip_all)]
pub async fn delete_product(
    _auth: RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(index): Path<usize>,
    Form(form): Form<DeleteForm>,
) -> Result<Response> {
    if form.confirm != "true" {
        return Err(AppError::BadRequest(
            "deleting a product requires confirm=true".to_string(),
        ));
    }

    let (mut editor, _) = working_copy(&state, &session).await?;
    match editor.delete(index) {
        Ok(product) => saved(&session, &editor, format!("Deleted {}.", product.name), "").await,
        Err(e) => Ok(rejected(&state, &editor, e)),
    }
}

/// Embed an uploaded image in a product.
///
/// POST /products/{index}/image (multipart, field `image`)
#[instrument(skip_all)]
pub async fn upload_image(
    _auth: RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(index): Path<usize>,
    mut multipart: Multipart,
) -> Result<Response> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        upload = Some((bytes, content_type));
        break;
    }

    let Some((bytes, content_type)) = upload else {
        return Err(AppError::BadRequest("no image was uploaded".to_string()));
    };
    if bytes.is_empty() {
        return Err(AppError::BadRequest("the uploaded image is empty".to_string()));
    }

    let (mut editor, _) = working_copy(&state, &session).await?;
    match editor.set_image_upload(index, &bytes, &content_type) {
        Ok(()) => {
            let anchor = format!("#product-{index}");
            saved(&session, &editor, "Image uploaded.".to_string(), &anchor).await
        }
        Err(e) => Ok(rejected(&state, &editor, e)),
    }
}

/// Dietary surcharge form.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PricingForm {
    pub gluten_free: String,
    pub sugar_free: String,
    pub vegan: String,
}

impl PricingForm {
    fn parse(&self) -> std::result::Result<DietaryPricing, EditorError> {
        Ok(DietaryPricing {
            gluten_free: parse_price(&self.gluten_free)?,
            sugar_free: parse_price(&self.sugar_free)?,
            vegan: parse_price(&self.vegan)?,
        })
    }
}

/// Replace the dietary surcharges.
///
/// POST /dietary-pricing
#[instrument(skip_all)]
pub async fn dietary_pricing(
    _auth: RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<PricingForm>,
) -> Result<Response> {
    let (mut editor, _) = working_copy(&state, &session).await?;
    match form.parse() {
        Ok(pricing) => {
            editor.set_dietary_pricing(pricing);
            saved(&session, &editor, "Dietary pricing saved.".to_string(), "#pricing").await
        }
        Err(e) => Ok(rejected(&state, &editor, e)),
    }
}

/// Discard the working copy; the next page view reloads the file.
///
/// POST /reload
#[instrument(skip_all)]
pub async fn reload(
    _auth: RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<Redirect> {
    session.remove_value(WORKING_COPY_KEY).await?;
    tracing::info!("Working copy discarded");
    set_flash(
        &session,
        format!("Reloaded from {}.", state.config().catalog_path.display()),
    )
    .await?;
    Ok(Redirect::to("/"))
}

fn attachment(filename: &str, body: String) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

/// The working copy as `products-data.json`.
///
/// GET /download
#[instrument(skip_all)]
pub async fn download(
    _auth: RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<Response> {
    let (editor, _) = working_copy(&state, &session).await?;
    let json = editor.to_json(Utc::now())?;
    tracing::info!(products = editor.products().len(), "Catalog downloaded");
    Ok(attachment(DOWNLOAD_FILENAME, json))
}

/// A dated backup of the product list.
///
/// GET /export
#[instrument(skip_all)]
pub async fn export(
    _auth: RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<Response> {
    let (editor, _) = working_copy(&state, &session).await?;
    let now = Utc::now();
    let json = editor.export_backup(now)?;
    tracing::info!(products = editor.products().len(), "Backup exported");
    Ok(attachment(&editor::backup_filename(now), json))
}
