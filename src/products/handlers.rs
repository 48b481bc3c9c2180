use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use bytes::Bytes;
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{jwt::AuthUser, repo::User},
    error::ApiError,
    hostel,
    products::{
        dto::{ProductResponse, UpdateProductRequest},
        repo::{self, NewProduct, ProductRow},
        services,
    },
    state::AppState,
};

pub fn read_router() -> Router<AppState> {
    Router::new().route("/products", get(list_products))
}

pub fn write_router() -> Router<AppState> {
    Router::new()
        .route("/products", post(create_product))
        .route("/products/mine", get(my_products))
        .route("/products/:id", put(update_product))
        .route("/products/:id", delete(delete_product))
        .route("/products/:id/sold", patch(mark_sold))
        .route("/products/:id/save", patch(toggle_save))
        .route("/products/:id/like", patch(toggle_like))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB
}

async fn load_product(db: &PgPool, id: Uuid) -> Result<ProductRow, ApiError> {
    repo::find_by_id(db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let rows = repo::list_all(&state.db).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state))]
pub async fn my_products(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let rows = repo::list_by_seller(&state.db, user_id).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// POST /products (multipart): title, description, price, category,
/// optional hostel_block/hostel_type, optional image file.
#[instrument(skip(state, mp))]
pub async fn create_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let mut title = None;
    let mut description = None;
    let mut price_raw = None;
    let mut category = None;
    let mut hostel_block = None;
    let mut hostel_type = None;
    let mut image: Option<(Bytes, String)> = None;

    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|_| ApiError::validation("Error parsing form data"))?
    {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("title") => title = Some(read_text(field).await?),
            Some("description") => description = Some(read_text(field).await?),
            Some("price") => price_raw = Some(read_text(field).await?),
            Some("category") => category = Some(read_text(field).await?),
            Some("hostel_block") => hostel_block = Some(read_text(field).await?),
            Some("hostel_type") => hostel_type = Some(read_text(field).await?),
            Some("image") => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let data = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::validation("Error parsing form data"))?;
                if !data.is_empty() {
                    image = Some((data, content_type));
                }
            }
            _ => {}
        }
    }

    let title = require(title)?;
    let description = require(description)?;
    let category = require(category)?;
    let price: i64 = require(price_raw)?
        .parse()
        .ok()
        .filter(|p: &i64| *p >= 0)
        .ok_or_else(|| ApiError::validation("Price must be a non-negative number"))?;

    let hostel_block = hostel_block.filter(|v| !v.is_empty());
    let hostel_type = hostel_type.filter(|v| !v.is_empty());
    if let Some(block) = hostel_block.as_deref() {
        if !hostel::is_valid_block(block) {
            return Err(ApiError::validation("Invalid hostel block"));
        }
    }
    if let Some(ht) = hostel_type.as_deref() {
        if !hostel::is_valid_type(ht) {
            return Err(ApiError::validation("Invalid hostel type"));
        }
    }

    // Listing requires a verified account with a complete profile; the
    // seller's contact details are snapshotted onto the product.
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User not found".into()))?;
    if !user.is_verified || !user.is_profile_complete {
        return Err(ApiError::Forbidden(
            "Complete your profile before listing items".into(),
        ));
    }
    let Some(seller_mobile) = user.mobile_number.clone() else {
        return Err(ApiError::Forbidden(
            "Complete your profile before listing items".into(),
        ));
    };

    // Upload failure aborts creation; a listing never carries a broken
    // image reference.
    let image_url = match image {
        Some((data, content_type)) => Some(
            services::upload_product_image(&state, user_id, data, &content_type)
                .await
                .map_err(ApiError::Upload)?,
        ),
        None => None,
    };

    let product_id = repo::create(
        &state.db,
        NewProduct {
            title: &title,
            description: &description,
            price,
            category: &category,
            hostel_block: hostel_block.as_deref(),
            hostel_type: hostel_type.as_deref(),
            seller: user.id,
            seller_name: &user.name,
            seller_mobile: &seller_mobile,
            image_url: image_url.as_deref(),
        },
    )
    .await?;

    let product = load_product(&state.db, product_id).await?;
    info!(product_id = %product_id, seller = %user.id, "product created");
    Ok((StatusCode::CREATED, Json(product.into())))
}

#[instrument(skip(state, payload))]
pub async fn update_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = load_product(&state.db, id).await?;
    if product.seller != user_id {
        return Err(ApiError::Forbidden(
            "Unauthorized to update this product".into(),
        ));
    }

    if let Some(price) = payload.price {
        if price < 0 {
            return Err(ApiError::validation("Price must be a non-negative number"));
        }
    }
    if let Some(block) = payload.hostel_block() {
        if !hostel::is_valid_block(block) {
            return Err(ApiError::validation("Invalid hostel block"));
        }
    }
    if let Some(ht) = payload.hostel_type() {
        if !hostel::is_valid_type(ht) {
            return Err(ApiError::validation("Invalid hostel type"));
        }
    }

    repo::update_fields(&state.db, id, &payload).await?;
    let updated = load_product(&state.db, id).await?;
    Ok(Json(updated.into()))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let product = load_product(&state.db, id).await?;
    if product.seller != user_id {
        return Err(ApiError::Forbidden(
            "Unauthorized to delete this product".into(),
        ));
    }

    // Best-effort image cleanup; the listing is removed either way.
    if let Some(url) = &product.image_url {
        if let Some(key) = services::object_key_from_url(url, &state.config.minio_bucket) {
            if let Err(e) = state.storage.delete_object(key).await {
                warn!(error = %e, key, "failed to delete product image");
            }
        }
    }

    repo::delete(&state.db, id).await?;
    info!(product_id = %id, seller = %user_id, "product deleted");
    Ok(Json(
        serde_json::json!({ "message": "Product deleted successfully" }),
    ))
}

#[instrument(skip(state))]
pub async fn mark_sold(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = load_product(&state.db, id).await?;
    if product.seller != user_id {
        return Err(ApiError::Forbidden(
            "Unauthorized to mark this product as sold".into(),
        ));
    }

    // Idempotent: re-marking an already sold product succeeds.
    repo::mark_sold(&state.db, id).await?;
    let updated = load_product(&state.db, id).await?;
    Ok(Json(updated.into()))
}

#[instrument(skip(state))]
pub async fn toggle_save(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductResponse>, ApiError> {
    load_product(&state.db, id).await?;
    repo::toggle_save(&state.db, id, user_id).await?;
    let updated = load_product(&state.db, id).await?;
    Ok(Json(updated.into()))
}

#[instrument(skip(state))]
pub async fn toggle_like(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductResponse>, ApiError> {
    load_product(&state.db, id).await?;
    repo::toggle_like(&state.db, id, user_id).await?;
    let updated = load_product(&state.db, id).await?;
    Ok(Json(updated.into()))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map(|s| s.trim().to_string())
        .map_err(|_| ApiError::validation("Error parsing form data"))
}

fn require(value: Option<String>) -> Result<String, ApiError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::validation("Missing required fields"))
}
