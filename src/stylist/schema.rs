use serde_json::{json, Value};

/// Schema of a single outfit object in the model's structured output.
pub fn outfit_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "styleTitle": {
                "type": "STRING",
                "description": "A catchy name for the style (e.g., 'Chic Casual', 'Elegant Evening')."
            },
            "outfitDescription": {
                "type": "STRING",
                "description": "A detailed description covering the style, recommended colors, and fabrics."
            },
            "colorPalette": {
                "type": "ARRAY",
                "description": "An array of key colors for the outfit. For each color, provide both its name and its corresponding HEX code.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING", "description": "The name of the color." },
                        "hex": { "type": "STRING", "description": "The hex code for the color (e.g., '#FFFFFF')." }
                    },
                    "required": ["name", "hex"]
                }
            },
            "occasionFit": {
                "type": "ARRAY",
                "description": "An array of suitable occasions (e.g., 'Daily Wear', 'Office', 'Party', 'Wedding').",
                "items": { "type": "STRING" }
            },
            "accessories": {
                "type": "ARRAY",
                "description": "An array of suggestions for accessories.",
                "items": { "type": "STRING" }
            },
            "imagePrompt": {
                "type": "STRING",
                "description": "A detailed, descriptive prompt for an image generation model. This prompt should describe ONLY the clothing items, accessories, and shoes for the outfit. Do not describe a person or a background."
            }
        },
        "required": ["styleTitle", "outfitDescription", "colorPalette", "occasionFit", "accessories", "imagePrompt"]
    })
}

/// Top-level response schema: an array of outfits.
pub fn fashion_advice_schema() -> Value {
    json!({
        "type": "ARRAY",
        "description": "An array of diverse and fashionable outfit recommendations based on the user's photo and profile.",
        "items": outfit_schema()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_outfit_field_is_required() {
        let schema = fashion_advice_schema();
        let required: Vec<&str> = schema["items"]["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(required.len(), 6);
        assert!(required.contains(&"imagePrompt"));
    }
}
