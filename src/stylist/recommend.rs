use thiserror::Error;
use tracing::{error, info, instrument};

use super::advisor::{AdvisorError, StyleAdvisor};
use super::outfit::{ImageError, InlineImage, Outfit};
use super::profile::UserProfile;
use super::prompts::{analysis_prompt, more_outfits_prompt, try_on_prompt, MORE_COUNT};

#[derive(Debug, Error)]
pub enum StylistError {
    #[error("The AI returned an invalid response. Please try again.")]
    InvalidResponse,

    #[error("Image generation failed to return an image.")]
    NoImage,

    #[error("No image prompt provided.")]
    MissingPrompt,

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Advisor(#[from] AdvisorError),
}

/// Parses the model's structured answer into outfits.
pub fn parse_outfits(raw: &str) -> Result<Vec<Outfit>, StylistError> {
    let text = strip_json_fences(raw);
    serde_json::from_str::<Vec<Outfit>>(text).map_err(|e| {
        error!(error = %e, raw = %raw, "failed to parse outfit JSON");
        StylistError::InvalidResponse
    })
}

/// First look at the photo: three outfits personalised by the profile.
#[instrument(skip_all)]
pub async fn analyze_image(
    advisor: &dyn StyleAdvisor,
    image: &InlineImage,
    profile: &UserProfile,
) -> Result<Vec<Outfit>, StylistError> {
    let prompt = analysis_prompt(profile);
    let raw = advisor.analyze(image, &prompt).await?;
    let outfits = parse_outfits(&raw)?;
    info!(count = outfits.len(), "outfits generated");
    Ok(outfits)
}

/// "See more": two new outfits distinct from `existing_titles`, optionally
/// containing the filtered clothing items.
#[instrument(skip_all, fields(existing = existing_titles.len(), filters = filters.len()))]
pub async fn more_outfits(
    advisor: &dyn StyleAdvisor,
    image: &InlineImage,
    existing_titles: &[String],
    profile: &UserProfile,
    filters: &[String],
) -> Result<Vec<Outfit>, StylistError> {
    let prompt = more_outfits_prompt(existing_titles, profile, filters);
    let raw = advisor.analyze(image, &prompt).await?;
    let mut outfits = parse_outfits(&raw)?;
    outfits.truncate(MORE_COUNT);
    info!(count = outfits.len(), "additional outfits generated");
    Ok(outfits)
}

/// Renders the user wearing the outfit described by `outfit_prompt`.
#[instrument(skip_all)]
pub async fn generate_outfit_images(
    advisor: &dyn StyleAdvisor,
    outfit_prompt: &str,
    image: &InlineImage,
) -> Result<Vec<InlineImage>, StylistError> {
    if outfit_prompt.trim().is_empty() {
        return Err(StylistError::MissingPrompt);
    }
    let images = advisor
        .synthesize_image(image, &try_on_prompt(outfit_prompt))
        .await?;
    if images.is_empty() {
        error!("image generation returned no image parts");
        return Err(StylistError::NoImage);
    }
    info!(count = images.len(), "try-on images generated");
    Ok(images)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => {
            let stripped = stripped.trim_start();
            stripped
                .strip_suffix("```")
                .map(|s| s.trim())
                .unwrap_or(stripped)
        }
        None => text,
    }
}
