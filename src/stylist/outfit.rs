use base64ct::{Base64, Encoding};
use serde::{Deserialize, Serialize};

/// A named colour with its hex code, e.g. `{"name": "Navy", "hex": "#000080"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorInfo {
    pub name: String,
    pub hex: String,
}

/// One AI-generated clothing recommendation.
///
/// Outfits carry no identifier; the title is the only (best-effort) notion
/// of identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outfit {
    pub style_title: String,
    pub outfit_description: String,
    pub color_palette: Vec<ColorInfo>,
    pub occasion_fit: Vec<String>,
    pub accessories: Vec<String>,
    pub image_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_match: Option<u8>,
    /// Try-on images kept alongside the outfit on the client. Never stored
    /// in the database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_images: Option<Vec<InlineImage>>,
}

impl Outfit {
    /// Short summary used when asking the model for something different.
    pub fn summary(&self) -> &str {
        &self.style_title
    }
}

/// Base64 image payload plus its MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("Please upload a valid image file.")]
    NotAnImage,
    #[error("Image data is not valid base64.")]
    InvalidBase64,
}

impl InlineImage {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(mime_type, Base64::encode_string(bytes))
    }

    /// Accepts either raw base64 or a `data:<mime>;base64,<payload>` URL and
    /// returns a normalised image with the prefix stripped.
    pub fn normalized(self) -> Result<Self, ImageError> {
        let InlineImage { mime_type, data } = self;
        let (mime_type, data) = match data.strip_prefix("data:").map(str::to_owned) {
            Some(rest) => {
                let (header, payload) = rest.split_once(',').ok_or(ImageError::InvalidBase64)?;
                let mime = header.trim_end_matches(";base64");
                let mime = if mime.is_empty() { mime_type } else { mime.to_string() };
                (mime, payload.to_string())
            }
            None => (mime_type, data),
        };
        if !mime_type.starts_with("image/") {
            return Err(ImageError::NotAnImage);
        }
        let out = Self { mime_type, data };
        out.decode()?;
        Ok(out)
    }

    pub fn decode(&self) -> Result<Vec<u8>, ImageError> {
        Base64::decode_vec(self.data.trim()).map_err(|_| ImageError::InvalidBase64)
    }

    pub fn extension(&self) -> &'static str {
        ext_from_mime(&self.mime_type).unwrap_or("bin")
    }
}

pub fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) fn sample_outfit(title: &str, occasions: &[&str]) -> Outfit {
    Outfit {
        style_title: title.to_string(),
        outfit_description: format!("{title} description"),
        color_palette: vec![ColorInfo {
            name: "Navy".into(),
            hex: "#000080".into(),
        }],
        occasion_fit: occasions.iter().map(|s| s.to_string()).collect(),
        accessories: vec!["Watch".into()],
        image_prompt: format!("{title} garments"),
        image_url: None,
        style_match: None,
        generated_images: None,
    }
}
