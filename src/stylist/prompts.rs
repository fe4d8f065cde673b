//! Natural-language instructions sent to the generative model.

use super::profile::{Gender, UserProfile};

pub const ANALYSIS_TASK: &str = "You are an AI fashion stylist. First, check the user's gender from the provided profile. Based on this, analyze the uploaded photo and suggest the best outfit styles, colors, fabrics, and accessories.

For 'Male' -> recommend shirts, jeans, blazers, kurta, suits, etc. with suitable color palettes and accessories (watch, shoes, belts).

For 'Female' -> recommend dresses, sarees, kurtis, lehengas, skirts, gowns, etc. with color palettes, accessories (jewelry, handbags, footwear, makeup).

Provide three diverse outfit recommendations. Return the response as a JSON array of objects.";

const MORE_OUTFITS_TASK: &str = "Based on the user's photo and gender, generate two more unique outfit recommendations that are fashionable and consider current style trends.";

const MORE_OUTFITS_FOOTER: &str =
    "Provide two new, distinct outfit ideas. Return the response as a JSON array of outfit objects.";

const PROFILE_INTRO: &str =
    "To make the recommendations even more personalized, consider the user's provided style profile:";

/// Number of outfits the initial analysis asks for.
pub const ANALYSIS_COUNT: usize = 3;
/// Number of outfits a "see more" request keeps.
pub const MORE_COUNT: usize = 2;

/// Lines describing the profile. Empty fields produce no line.
pub fn profile_clauses(profile: &UserProfile) -> Vec<String> {
    let mut parts = Vec::new();
    if profile.gender != Gender::Unspecified {
        parts.push(format!("- Gender: {}", profile.gender.as_str()));
    }
    if let Some(v) = non_empty(&profile.body_shape) {
        parts.push(format!("- Body Shape: {v}"));
    }
    if let Some(v) = non_empty(&profile.skin_tone) {
        parts.push(format!("- Skin Tone: {v}"));
    }
    let styles: Vec<&str> = profile
        .style_preferences
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if !styles.is_empty() {
        parts.push(format!("- Preferred Styles: {}", styles.join(", ")));
    }
    if let Some(v) = profile.preferred_colors.as_deref().and_then(non_empty) {
        parts.push(format!("- User likes these colors: {v}. Try to include them."));
    }
    if let Some(v) = profile.disliked_colors.as_deref().and_then(non_empty) {
        parts.push(format!("- User dislikes these colors: {v}. Avoid suggesting these."));
    }
    if let Some(budget) = profile.budget.filter(|b| *b > 0) {
        parts.push(format!(
            "- Budget: around {budget} per outfit. Keep suggestions within it."
        ));
    }
    parts
}

/// Appends the profile block and the item-filter clause to `base`.
pub fn build_fashion_prompt(base: &str, profile: &UserProfile, filters: &[String]) -> String {
    let mut prompt = base.to_string();

    let parts = profile_clauses(profile);
    if !parts.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(PROFILE_INTRO);
        prompt.push('\n');
        prompt.push_str(&parts.join("\n"));
    }

    let filters: Vec<&str> = filters
        .iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .collect();
    if !filters.is_empty() {
        prompt.push_str(&format!(
            "\n\nCrucially, the user is specifically looking for outfits that include the following items: {}. Please prioritize generating outfits that contain these specific pieces.",
            filters.join(", ")
        ));
    }

    prompt
}

pub fn diversity_clause(existing_titles: &[String]) -> String {
    format!(
        "Avoid suggesting outfits similar to these already provided: {}.",
        existing_titles.join(", ")
    )
}

pub fn analysis_prompt(profile: &UserProfile) -> String {
    build_fashion_prompt(ANALYSIS_TASK, profile, &[])
}

pub fn more_outfits_prompt(
    existing_titles: &[String],
    profile: &UserProfile,
    filters: &[String],
) -> String {
    let base = format!(
        "{MORE_OUTFITS_TASK}\n{}\n{MORE_OUTFITS_FOOTER}",
        diversity_clause(existing_titles)
    );
    build_fashion_prompt(&base, profile, filters)
}

pub fn try_on_prompt(outfit_prompt: &str) -> String {
    format!(
        "Using the provided image of the person, realistically dress them in the following outfit, keeping their body shape and pose: {}. The background should be a neutral studio setting.",
        outfit_prompt.trim()
    )
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_profile() -> UserProfile {
        UserProfile {
            gender: Gender::Male,
            body_shape: "Athletic".into(),
            skin_tone: "Warm".into(),
            style_preferences: vec!["Classic".into(), "Streetwear".into()],
            preferred_colors: Some("navy, olive".into()),
            disliked_colors: Some("neon green".into()),
            budget: Some(150),
        }
    }

    #[test]
    fn gender_only_profile_has_only_gender_clause() {
        let profile = UserProfile {
            gender: Gender::Female,
            ..Default::default()
        };
        let prompt = analysis_prompt(&profile);
        assert!(prompt.starts_with(ANALYSIS_TASK));
        assert!(prompt.contains("- Gender: Female"));
        for absent in [
            "- Body Shape:",
            "- Skin Tone:",
            "- Preferred Styles:",
            "- User likes these colors:",
            "- User dislikes these colors:",
            "- Budget:",
            "Crucially",
        ] {
            assert!(!prompt.contains(absent), "unexpected clause {absent:?}");
        }
    }

    #[test]
    fn empty_profile_adds_nothing() {
        let prompt = analysis_prompt(&UserProfile::default());
        assert_eq!(prompt, ANALYSIS_TASK);
    }

    #[test]
    fn whitespace_fields_count_as_empty() {
        let profile = UserProfile {
            body_shape: "   ".into(),
            preferred_colors: Some(" ".into()),
            style_preferences: vec!["".into()],
            ..Default::default()
        };
        assert!(profile_clauses(&profile).is_empty());
    }

    #[test]
    fn full_profile_lists_every_clause_in_order() {
        let clauses = profile_clauses(&full_profile());
        assert_eq!(
            clauses,
            vec![
                "- Gender: Male",
                "- Body Shape: Athletic",
                "- Skin Tone: Warm",
                "- Preferred Styles: Classic, Streetwear",
                "- User likes these colors: navy, olive. Try to include them.",
                "- User dislikes these colors: neon green. Avoid suggesting these.",
                "- Budget: around 150 per outfit. Keep suggestions within it.",
            ]
        );
        let prompt = analysis_prompt(&full_profile());
        assert!(prompt.contains(PROFILE_INTRO));
    }

    #[test]
    fn filters_add_priority_clause() {
        let prompt = build_fashion_prompt(
            "base",
            &UserProfile::default(),
            &["Jacket".into(), "Skirt".into()],
        );
        assert!(prompt.ends_with("following items: Jacket, Skirt. Please prioritize generating outfits that contain these specific pieces."));
    }

    #[test]
    fn diversity_clause_follows_existing_titles() {
        let profile = UserProfile::default();
        let a = more_outfits_prompt(&["Chic Casual".into()], &profile, &[]);
        let b = more_outfits_prompt(
            &["Chic Casual".into(), "Elegant Evening".into()],
            &profile,
            &[],
        );
        assert_ne!(a, b);
        assert!(a.contains("already provided: Chic Casual."));
        assert!(b.contains("already provided: Chic Casual, Elegant Evening."));
    }

    #[test]
    fn try_on_prompt_wraps_garments() {
        let p = try_on_prompt(" a red linen shirt ");
        assert!(p.contains("keeping their body shape and pose: a red linen shirt."));
        assert!(p.ends_with("neutral studio setting."));
    }
}
