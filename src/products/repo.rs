use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::products::dto::UpdateProductRequest;

/// Product row joined with its seller and membership sets.
#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub category: String,
    pub hostel_block: Option<String>,
    pub hostel_type: Option<String>,
    pub seller: Uuid,
    pub seller_name: String,
    pub seller_mobile: String,
    pub image_url: Option<String>,
    pub is_sold: bool,
    pub created_at: OffsetDateTime,
    pub seller_display_name: String,
    pub seller_email: String,
    pub likes: Vec<Uuid>,
    pub saved_by: Vec<Uuid>,
}

/// Fields fixed at creation time. `seller_name`/`seller_mobile` are a
/// snapshot of the seller's profile; later profile edits do not rewrite
/// past listings.
#[derive(Debug)]
pub struct NewProduct<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub price: i64,
    pub category: &'a str,
    pub hostel_block: Option<&'a str>,
    pub hostel_type: Option<&'a str>,
    pub seller: Uuid,
    pub seller_name: &'a str,
    pub seller_mobile: &'a str,
    pub image_url: Option<&'a str>,
}

const PRODUCT_SELECT: &str = "\
    SELECT p.id, p.title, p.description, p.price, p.category, \
           p.hostel_block, p.hostel_type, p.seller, p.seller_name, p.seller_mobile, \
           p.image_url, p.is_sold, p.created_at, \
           u.name AS seller_display_name, u.email AS seller_email, \
           COALESCE((SELECT array_agg(l.user_id) FROM product_likes l \
                     WHERE l.product_id = p.id), ARRAY[]::uuid[]) AS likes, \
           COALESCE((SELECT array_agg(s.user_id) FROM product_saves s \
                     WHERE s.product_id = p.id), ARRAY[]::uuid[]) AS saved_by \
    FROM products p \
    JOIN users u ON u.id = p.seller";

pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<ProductRow>> {
    let sql = format!("{PRODUCT_SELECT} ORDER BY p.created_at DESC");
    let rows = sqlx::query_as::<_, ProductRow>(&sql).fetch_all(db).await?;
    Ok(rows)
}

pub async fn list_by_seller(db: &PgPool, seller: Uuid) -> anyhow::Result<Vec<ProductRow>> {
    let sql = format!("{PRODUCT_SELECT} WHERE p.seller = $1 ORDER BY p.created_at DESC");
    let rows = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(seller)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<ProductRow>> {
    let sql = format!("{PRODUCT_SELECT} WHERE p.id = $1");
    let row = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn create(db: &PgPool, new: NewProduct<'_>) -> anyhow::Result<Uuid> {
    let id: (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO products (title, description, price, category, hostel_block,
                              hostel_type, seller, seller_name, seller_mobile, image_url)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id
        "#,
    )
    .bind(new.title)
    .bind(new.description)
    .bind(new.price)
    .bind(new.category)
    .bind(new.hostel_block)
    .bind(new.hostel_type)
    .bind(new.seller)
    .bind(new.seller_name)
    .bind(new.seller_mobile)
    .bind(new.image_url)
    .fetch_one(db)
    .await?;
    Ok(id.0)
}

/// Whitelist patch. Seller, sold flag and membership sets are not
/// reachable through this path.
pub async fn update_fields(
    db: &PgPool,
    id: Uuid,
    patch: &UpdateProductRequest,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE products
        SET title = COALESCE($2, title),
            description = COALESCE($3, description),
            price = COALESCE($4, price),
            category = COALESCE($5, category),
            hostel_block = COALESCE($6, hostel_block),
            hostel_type = COALESCE($7, hostel_type),
            image_url = COALESCE($8, image_url),
            updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(patch.title())
    .bind(patch.description())
    .bind(patch.price)
    .bind(patch.category())
    .bind(patch.hostel_block())
    .bind(patch.hostel_type())
    .bind(patch.image_url())
    .execute(db)
    .await?;
    Ok(())
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<u64> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}

/// One-way in normal flow; a second call keeps the flag true and succeeds.
pub async fn mark_sold(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
    sqlx::query("UPDATE products SET is_sold = TRUE, updated_at = now() WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

/// Atomic membership flip keyed by (product_id, user_id): remove if
/// present, otherwise insert. Never a read-modify-write of the whole set,
/// so concurrent toggles by different users cannot lose updates.
pub async fn toggle_like(db: &PgPool, product_id: Uuid, user_id: Uuid) -> anyhow::Result<()> {
    let removed = sqlx::query("DELETE FROM product_likes WHERE product_id = $1 AND user_id = $2")
        .bind(product_id)
        .bind(user_id)
        .execute(db)
        .await?
        .rows_affected();
    if removed == 0 {
        sqlx::query(
            "INSERT INTO product_likes (product_id, user_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(product_id)
        .bind(user_id)
        .execute(db)
        .await?;
    }
    Ok(())
}

pub async fn toggle_save(db: &PgPool, product_id: Uuid, user_id: Uuid) -> anyhow::Result<()> {
    let removed = sqlx::query("DELETE FROM product_saves WHERE product_id = $1 AND user_id = $2")
        .bind(product_id)
        .bind(user_id)
        .execute(db)
        .await?
        .rows_affected();
    if removed == 0 {
        sqlx::query(
            "INSERT INTO product_saves (product_id, user_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(product_id)
        .bind(user_id)
        .execute(db)
        .await?;
    }
    Ok(())
}
