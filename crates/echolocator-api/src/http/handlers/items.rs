//! Item handlers: upload, listings and lookup by id.

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use serde::Serialize;

use echolocator_core::service::gateway::Listing;
use echolocator_types::item::{ImageContentType, ItemId, ItemSubmission, ItemView};

use crate::http::error::AppError;
use crate::http::extractors::query::LimitQuery;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

pub const STORED_MESSAGE: &str = "Item stored successfully.";

const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Serialize)]
pub struct StoredItem {
    pub message: &'static str,
    pub item: ItemView,
}

#[derive(Debug, Serialize)]
pub struct ItemList {
    pub items: Vec<ItemView>,
}

/// POST /api/items - Upload one item as multipart form data.
///
/// Fields: `title`, `location`, `description`, `finder_contact`, and the
/// `image` file part.
pub async fn create_item(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<StoredItem>>), AppError> {
    let timer = RequestTimer::start();

    let submission = read_submission(multipart).await?;
    let item = state.gateway.ingest(submission).await?;

    let resp = ApiResponse::success(
        StoredItem {
            message: STORED_MESSAGE,
            item,
        },
        &timer,
    );
    Ok((StatusCode::CREATED, Json(resp)))
}

/// GET /api/items - Newest items first.
pub async fn list_items(
    State(state): State<AppState>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<ItemList>>, AppError> {
    listing(&state, Listing::All, query)
}

/// GET /api/items/recent - The short listing shown on the landing page.
pub async fn recent_items(
    State(state): State<AppState>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<ItemList>>, AppError> {
    listing(&state, Listing::Recent, query)
}

/// GET /api/items/{id}
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ItemView>>, AppError> {
    let timer = RequestTimer::start();

    let id: ItemId = id
        .parse()
        .map_err(|_| AppError::validation("Item id must be a positive integer."))?;
    let item = state.gateway.get_item(id)?;

    Ok(Json(ApiResponse::success(item, &timer)))
}

fn listing(
    state: &AppState,
    listing: Listing,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<ItemList>>, AppError> {
    let timer = RequestTimer::start();
    let Query(query) = query.map_err(|e| AppError::validation(e.body_text()))?;

    let items = state.gateway.list(listing, query.limit)?;
    Ok(Json(ApiResponse::success(ItemList { items }, &timer)))
}

fn multipart_error(e: MultipartError) -> AppError {
    AppError::validation(e.body_text())
}

/// Collect the form fields. Unknown fields are ignored; validation of
/// values is left to the ingestion pipeline.
async fn read_submission(mut multipart: Multipart) -> Result<ItemSubmission, AppError> {
    let mut title = String::new();
    let mut location = String::new();
    let mut description = None;
    let mut finder_contact = None;
    let mut image: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "image" => {
                let content_type = match field.content_type() {
                    Some(declared) if !declared.eq_ignore_ascii_case(OCTET_STREAM) => {
                        declared.to_string()
                    }
                    declared => infer_from_file_name(field.file_name())
                        .or_else(|| declared.map(str::to_string))
                        .unwrap_or_default(),
                };
                let bytes = field.bytes().await.map_err(multipart_error)?;
                image = Some((content_type, bytes.to_vec()));
            }
            "title" => title = field.text().await.map_err(multipart_error)?,
            "location" => location = field.text().await.map_err(multipart_error)?,
            "description" => description = Some(field.text().await.map_err(multipart_error)?),
            "finder_contact" => {
                finder_contact = Some(field.text().await.map_err(multipart_error)?)
            }
            _ => {}
        }
    }

    let (content_type, image) =
        image.ok_or_else(|| AppError::validation("Image file is required."))?;

    Ok(ItemSubmission {
        title,
        location,
        description,
        finder_contact,
        content_type,
        image,
    })
}

/// Content type for an image part declared as `application/octet-stream`
/// or not declared at all, taken from the file extension.
fn infer_from_file_name(file_name: Option<&str>) -> Option<String> {
    let ext = std::path::Path::new(file_name?).extension()?.to_str()?;
    ImageContentType::from_extension(ext).map(|ct| ct.mime().to_string())
}
