use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::stylist::Outfit;

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateHistoryRequest {
    pub outfit: Outfit,
}

/// History record as returned to the owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub id: Uuid,
    pub user: Uuid,
    pub outfit: Outfit,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
