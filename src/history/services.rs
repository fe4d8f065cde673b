use anyhow::Context;
use bytes::Bytes;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::dto::HistoryResponse;
use super::repo_types::{HistoryRecord, NewHistory};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::stylist::Outfit;

/// Saves `outfit` for `user_id`. The first try-on image carried by the
/// outfit, if any, goes to object storage; the rest are dropped.
pub async fn save_outfit(
    st: &AppState,
    user_id: Uuid,
    mut outfit: Outfit,
) -> ApiResult<HistoryRecord> {
    let id = Uuid::new_v4();

    let image = outfit
        .generated_images
        .take()
        .and_then(|images| images.into_iter().next());

    let image_key = match image {
        Some(image) => {
            let image = image
                .normalized()
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            let body = image
                .decode()
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            let key = format!("history/{}/{}.{}", user_id, id, image.extension());
            st.storage
                .put_object(&key, Bytes::from(body), &image.mime_type)
                .await
                .with_context(|| format!("put_object {}", key))?;
            debug!(%key, "try-on image stored");
            Some(key)
        }
        None => None,
    };

    let inserted = st
        .history
        .insert(NewHistory {
            id,
            user_id,
            outfit,
            image_key: image_key.clone(),
        })
        .await;
    let record = match inserted {
        Ok(record) => record,
        Err(e) => {
            // Nothing references the object once the insert failed.
            if let Some(key) = &image_key {
                remove_image(st, key).await;
            }
            return Err(e.into());
        }
    };
    info!(history_id = %record.id, %user_id, title = %record.outfit.style_title, "outfit saved");
    Ok(record)
}

/// Saves every outfit on its own detached task. A failed save is logged and
/// affects nothing else. Callers may drop the handles.
pub fn persist_outfits(st: &AppState, user_id: Uuid, outfits: &[Outfit]) -> Vec<JoinHandle<()>> {
    outfits
        .iter()
        .cloned()
        .map(|outfit| {
            let st = st.clone();
            tokio::spawn(async move {
                let title = outfit.style_title.clone();
                if let Err(e) = save_outfit(&st, user_id, outfit).await {
                    warn!(error = %e, %user_id, %title, "background history save failed");
                }
            })
        })
        .collect()
}

/// Builds the response, swapping a stored image key for a presigned URL.
pub async fn to_response(st: &AppState, record: HistoryRecord) -> HistoryResponse {
    let mut outfit = record.outfit;
    if let Some(key) = &record.image_key {
        match st
            .storage
            .presign_get(key, st.config.storage.presign_ttl_secs)
            .await
        {
            Ok(url) => outfit.image_url = Some(url),
            Err(e) => warn!(error = %e, %key, "presign failed"),
        }
    }
    HistoryResponse {
        id: record.id,
        user: record.user_id,
        outfit,
        created_at: record.created_at,
    }
}

pub async fn to_responses(st: &AppState, records: Vec<HistoryRecord>) -> Vec<HistoryResponse> {
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        out.push(to_response(st, record).await);
    }
    out
}

/// Best-effort removal of a stored image.
pub async fn remove_image(st: &AppState, key: &str) {
    if let Err(e) = st.storage.delete_object(key).await {
        warn!(error = %e, %key, "failed to delete stored image");
    }
}

/// Removes every stored image of a user's history, ahead of deleting the
/// user (the records themselves cascade in the database).
pub async fn purge_user_images(st: &AppState, user_id: Uuid) -> anyhow::Result<usize> {
    let records = st.history.list_by_user(user_id).await?;
    let mut removed = 0;
    for key in records.iter().filter_map(|r| r.image_key.as_deref()) {
        remove_image(st, key).await;
        removed += 1;
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::history::repo::HistoryStore;
    use crate::stylist::outfit::sample_outfit;
    use crate::stylist::InlineImage;

    #[tokio::test]
    async fn save_uploads_first_generated_image_only() {
        let (st, storage) = AppState::fake_with(Default::default());
        let user = Uuid::new_v4();
        let mut outfit = sample_outfit("Chic Casual", &["Office"]);
        outfit.generated_images = Some(vec![
            InlineImage::from_bytes("image/png", b"first"),
            InlineImage::from_bytes("image/png", b"second"),
        ]);

        let record = save_outfit(&st, user, outfit).await.unwrap();
        let key = record.image_key.clone().unwrap();
        assert!(key.starts_with(&format!("history/{user}/")));
        assert!(key.ends_with(".png"));
        assert!(record.outfit.generated_images.is_none());
        assert_eq!(storage.len(), 1);

        let response = to_response(&st, record).await;
        assert_eq!(
            response.outfit.image_url.as_deref(),
            Some(format!("https://fake.local/{key}").as_str())
        );
    }

    #[tokio::test]
    async fn save_rejects_invalid_image() {
        let (st, storage) = AppState::fake_with(Default::default());
        let mut outfit = sample_outfit("Chic Casual", &[]);
        outfit.generated_images = Some(vec![InlineImage::new("image/png", "%%%")]);
        let err = save_outfit(&st, Uuid::new_v4(), outfit).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert!(storage.is_empty());
    }

    struct BrokenHistory;

    #[async_trait::async_trait]
    impl HistoryStore for BrokenHistory {
        async fn insert(&self, _new: NewHistory) -> anyhow::Result<HistoryRecord> {
            anyhow::bail!("db down")
        }
        async fn list_by_user(&self, _user_id: Uuid) -> anyhow::Result<Vec<HistoryRecord>> {
            Ok(Vec::new())
        }
        async fn find(&self, _id: Uuid) -> anyhow::Result<Option<HistoryRecord>> {
            Ok(None)
        }
        async fn delete(&self, _id: Uuid) -> anyhow::Result<bool> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn failed_insert_leaves_no_stored_image() {
        let (mut st, storage) = AppState::fake_with(Default::default());
        st.history = Arc::new(BrokenHistory);
        let mut outfit = sample_outfit("Orphan", &[]);
        outfit.generated_images = Some(vec![InlineImage::from_bytes("image/png", b"img")]);

        let err = save_outfit(&st, Uuid::new_v4(), outfit).await.unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn persist_outfits_saves_each_independently() {
        let st = AppState::fake();
        let user = Uuid::new_v4();
        let mut broken = sample_outfit("Broken", &[]);
        broken.generated_images = Some(vec![InlineImage::new("text/plain", "aGk=")]);
        let outfits = vec![sample_outfit("A", &[]), broken, sample_outfit("B", &[])];

        for handle in persist_outfits(&st, user, &outfits) {
            handle.await.unwrap();
        }

        let mut titles: Vec<String> = st
            .history
            .list_by_user(user)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.outfit.style_title)
            .collect();
        titles.sort();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn purge_removes_stored_images() {
        let (st, storage) = AppState::fake_with(Default::default());
        let user = Uuid::new_v4();
        let mut outfit = sample_outfit("Pictured", &[]);
        outfit.generated_images = Some(vec![InlineImage::from_bytes("image/jpeg", b"img")]);
        save_outfit(&st, user, outfit).await.unwrap();
        save_outfit(&st, user, sample_outfit("Plain", &[])).await.unwrap();

        assert_eq!(purge_user_images(&st, user).await.unwrap(), 1);
        assert!(storage.is_empty());
    }
}
