use anyhow::Context;
use bytes::Bytes;
use uuid::Uuid;

use crate::state::AppState;

/// Upload a listing image and return its public URL. The caller aborts
/// product creation if this fails; a product never references an image
/// that was not stored.
pub async fn upload_product_image(
    st: &AppState,
    seller: Uuid,
    body: Bytes,
    content_type: &str,
) -> anyhow::Result<String> {
    let id = Uuid::new_v4();
    let ext = ext_from_mime(content_type).unwrap_or("bin");
    let key = format!("products/{}/{}.{}", seller, id, ext);
    st.storage
        .put_object(&key, body, content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(st.storage.public_url(&key))
}

/// Recover the object key from a stored public URL, for best-effort
/// cleanup when a listing is deleted.
pub fn object_key_from_url<'a>(url: &'a str, bucket: &str) -> Option<&'a str> {
    let marker = format!("/{}/", bucket);
    url.find(&marker)
        .map(|i| &url[i + marker.len()..])
        .filter(|key| !key.is_empty())
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("image/heic"), Some("heic"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
        assert_eq!(ext_from_mime("whatever/else"), None);
    }

    #[tokio::test]
    async fn upload_returns_url_under_seller_prefix() {
        let state = AppState::fake();
        let seller = Uuid::new_v4();
        let url = upload_product_image(&state, seller, Bytes::from_static(b"img"), "image/png")
            .await
            .unwrap();
        assert!(url.contains(&format!("products/{}/", seller)));
        assert!(url.ends_with(".png"));
    }

    #[test]
    fn key_recovered_from_public_url() {
        let url = "https://minio.local/campuskart/products/abc/def.jpg";
        assert_eq!(
            object_key_from_url(url, "campuskart"),
            Some("products/abc/def.jpg")
        );
        assert_eq!(object_key_from_url(url, "other-bucket"), None);
        assert_eq!(object_key_from_url("https://minio.local/campuskart/", "campuskart"), None);
    }
}
