use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::stylist::Outfit;

/// A saved outfit owned by one user.
#[derive(Debug, Clone)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub outfit: Outfit,
    /// Object-storage key of the attached try-on image.
    pub image_key: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub(crate) struct HistoryRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub outfit: Json<Outfit>,
    pub image_key: Option<String>,
    pub created_at: OffsetDateTime,
}

impl From<HistoryRow> for HistoryRecord {
    fn from(r: HistoryRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            outfit: r.outfit.0,
            image_key: r.image_key,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug)]
pub struct NewHistory {
    pub id: Uuid,
    pub user_id: Uuid,
    pub outfit: Outfit,
    pub image_key: Option<String>,
}
