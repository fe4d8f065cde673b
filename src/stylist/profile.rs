use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    #[default]
    #[serde(rename = "")]
    Unspecified,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Unspecified => "",
        }
    }
}

/// Style attributes the user fills in to personalise prompts. Lives on the
/// client only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub gender: Gender,
    pub body_shape: String,
    pub skin_tone: String,
    pub style_preferences: Vec<String>,
    pub preferred_colors: Option<String>,
    pub disliked_colors: Option<String>,
    pub budget: Option<u32>,
}
