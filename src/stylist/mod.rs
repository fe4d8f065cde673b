//! Outfit recommendations: prompt assembly, the AI capability and its Gemini
//! backend, response parsing, and the HTTP surface that proxies the calls.

pub mod advisor;
pub mod board;
pub mod gemini;
pub mod handlers;
pub mod outfit;
pub mod profile;
pub mod prompts;
pub mod recommend;
pub mod schema;

pub use advisor::{AdvisorError, StyleAdvisor};
pub use board::OutfitBoard;
pub use gemini::GeminiClient;
pub use outfit::{ColorInfo, InlineImage, Outfit};
pub use profile::{Gender, UserProfile};
pub use recommend::StylistError;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::stylist_routes()
}
