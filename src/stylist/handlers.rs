use axum::{
    extract::{DefaultBodyLimit, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::advisor::AdvisorError;
use super::outfit::{InlineImage, Outfit};
use super::profile::UserProfile;
use super::recommend::{analyze_image, generate_outfit_images, more_outfits, StylistError};
use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    history::services::persist_outfits,
    state::AppState,
};

impl From<StylistError> for ApiError {
    fn from(e: StylistError) -> Self {
        match e {
            e @ (StylistError::Image(_) | StylistError::MissingPrompt) => {
                ApiError::BadRequest(e.to_string())
            }
            StylistError::Advisor(AdvisorError::Api { status, message }) => {
                warn!(status, %message, "AI provider rejected the call");
                ApiError::Upstream(message)
            }
            StylistError::Advisor(inner) => {
                warn!(error = %inner, "AI provider call failed");
                ApiError::Upstream(inner.to_string())
            }
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

pub fn stylist_routes() -> Router<AppState> {
    Router::new()
        .route("/stylist/analyze", post(analyze))
        .route("/stylist/more", post(more))
        .route("/stylist/try-on", post(try_on))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub image: InlineImage,
    #[serde(default)]
    pub profile: UserProfile,
    #[serde(default)]
    pub save_to_history: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoreRequest {
    pub image: InlineImage,
    #[serde(default)]
    pub profile: UserProfile,
    #[serde(default)]
    pub existing_titles: Vec<String>,
    #[serde(default)]
    pub filters: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TryOnRequest {
    #[serde(default)]
    pub prompt: String,
    pub image: InlineImage,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TryOnResponse {
    pub images: Vec<InlineImage>,
}

#[instrument(skip(state, body), fields(user_id = %auth.id, save = body.save_to_history))]
pub async fn analyze(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<AnalyzeRequest>,
) -> ApiResult<Json<Vec<Outfit>>> {
    let image = body.image.normalized().map_err(StylistError::from)?;
    let outfits = analyze_image(state.advisor.as_ref(), &image, &body.profile).await?;

    if body.save_to_history {
        // Detached; the response does not wait on persistence.
        persist_outfits(&state, auth.id, &outfits);
    }
    Ok(Json(outfits))
}

#[instrument(skip(state, body), fields(user_id = %auth.id))]
pub async fn more(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<MoreRequest>,
) -> ApiResult<Json<Vec<Outfit>>> {
    let image = body.image.normalized().map_err(StylistError::from)?;
    let outfits = more_outfits(
        state.advisor.as_ref(),
        &image,
        &body.existing_titles,
        &body.profile,
        &body.filters,
    )
    .await?;
    Ok(Json(outfits))
}

#[instrument(skip(state, body), fields(user_id = %auth.id))]
pub async fn try_on(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<TryOnRequest>,
) -> ApiResult<Json<TryOnResponse>> {
    let image = body.image.normalized().map_err(StylistError::from)?;
    let images = generate_outfit_images(state.advisor.as_ref(), &body.prompt, &image).await?;
    info!(count = images.len(), "try-on ready");
    Ok(Json(TryOnResponse { images }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        extract::FromRef,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::app::build_app;
    use crate::auth::{jwt::JwtKeys, Role, AUTH_TOKEN_HEADER};
    use crate::stylist::advisor::fake::ScriptedAdvisor;
    use crate::stylist::outfit::sample_outfit;

    use super::*;

    fn outfits_json(titles: &[&str]) -> String {
        let outfits: Vec<Outfit> = titles.iter().map(|t| sample_outfit(t, &["Party"])).collect();
        serde_json::to_string(&outfits).unwrap()
    }

    fn photo() -> Value {
        json!({ "mimeType": "image/jpeg", "data": "aGVsbG8=" })
    }

    async fn post_json(
        state: &AppState,
        user: Uuid,
        uri: &str,
        body: Value,
    ) -> (StatusCode, Value) {
        let token = JwtKeys::from_ref(state).sign(user, Role::User).unwrap();
        let req = Request::post(uri)
            .header("content-type", "application/json")
            .header(AUTH_TOKEN_HEADER, token)
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = build_app(state.clone()).oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn analyze_requires_token() {
        let app = build_app(AppState::fake());
        let req = Request::post("/api/stylist/analyze")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "image": photo() }).to_string()))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn analyze_returns_outfits_and_saves_in_background() {
        let advisor = Arc::new(ScriptedAdvisor::default().answer(outfits_json(&["A", "B", "C"])));
        let (state, _) = AppState::fake_with(advisor.clone());
        let user = Uuid::new_v4();

        let (status, body) = post_json(
            &state,
            user,
            "/api/stylist/analyze",
            json!({ "image": photo(), "profile": { "gender": "Female" }, "saveToHistory": true }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 3);
        assert!(advisor.last_prompt().unwrap().contains("- Gender: Female"));

        let mut saved = 0;
        for _ in 0..100 {
            saved = state.history.list_by_user(user).await.unwrap().len();
            if saved == 3 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(saved, 3);
    }

    #[tokio::test]
    async fn analyze_rejects_non_image_upload() {
        let state = AppState::fake();
        let (status, body) = post_json(
            &state,
            Uuid::new_v4(),
            "/api/stylist/analyze",
            json!({ "image": { "mimeType": "application/pdf", "data": "aGk=" } }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["msg"], "Please upload a valid image file.");
    }

    #[tokio::test]
    async fn garbled_answer_is_reported_as_invalid_response() {
        let advisor = Arc::new(ScriptedAdvisor::default().answer("not json at all"));
        let (state, _) = AppState::fake_with(advisor);
        let (status, body) = post_json(
            &state,
            Uuid::new_v4(),
            "/api/stylist/analyze",
            json!({ "image": photo() }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(
            body["msg"],
            "The AI returned an invalid response. Please try again."
        );
    }

    #[tokio::test]
    async fn provider_error_message_reaches_the_caller() {
        let advisor = Arc::new(ScriptedAdvisor::default().fail(AdvisorError::Api {
            status: 503,
            message: "The model is overloaded".into(),
        }));
        let (state, _) = AppState::fake_with(advisor);
        let (status, body) = post_json(
            &state,
            Uuid::new_v4(),
            "/api/stylist/analyze",
            json!({ "image": photo() }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["msg"], "The model is overloaded");
    }

    #[tokio::test]
    async fn empty_provider_answer_is_surfaced() {
        // No scripted answer: the fake reports empty content.
        let state = AppState::fake();
        let (status, body) = post_json(
            &state,
            Uuid::new_v4(),
            "/api/stylist/more",
            json!({ "image": photo(), "existingTitles": ["A"] }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["msg"], "AI returned empty content");
    }

    #[tokio::test]
    async fn more_keeps_at_most_two() {
        let advisor = Arc::new(ScriptedAdvisor::default().answer(outfits_json(&["D", "E", "F"])));
        let (state, _) = AppState::fake_with(advisor.clone());
        let (status, body) = post_json(
            &state,
            Uuid::new_v4(),
            "/api/stylist/more",
            json!({ "image": photo(), "existingTitles": ["A", "B"], "filters": ["Jacket"] }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
        let prompt = advisor.last_prompt().unwrap();
        assert!(prompt.contains("Jacket"));
    }

    #[tokio::test]
    async fn try_on_without_image_parts_fails() {
        let state = AppState::fake();
        let (status, body) = post_json(
            &state,
            Uuid::new_v4(),
            "/api/stylist/try-on",
            json!({ "prompt": "navy blazer", "image": photo() }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["msg"], "Image generation failed to return an image.");
    }

    #[tokio::test]
    async fn try_on_returns_generated_images() {
        let advisor = Arc::new(
            ScriptedAdvisor::default().images(vec![InlineImage::from_bytes("image/png", b"x")]),
        );
        let (state, _) = AppState::fake_with(advisor);
        let (status, body) = post_json(
            &state,
            Uuid::new_v4(),
            "/api/stylist/try-on",
            json!({ "prompt": "navy blazer", "image": photo() }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["images"][0]["mimeType"], "image/png");
    }

    #[tokio::test]
    async fn try_on_without_prompt_is_bad_request() {
        let state = AppState::fake();
        let (status, _) = post_json(
            &state,
            Uuid::new_v4(),
            "/api/stylist/try-on",
            json!({ "prompt": "  ", "image": photo() }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
