use super::outfit::Outfit;

/// Recommendation results as the user browses them: the outfits received so
/// far plus the clothing and occasion filters they picked.
#[derive(Debug, Clone, Default)]
pub struct OutfitBoard {
    outfits: Vec<Outfit>,
    clothing_filters: Vec<String>,
    occasion_filters: Vec<String>,
}

/// Clothing items the user can filter "see more" results by.
pub const CLOTHING_FILTERS: &[&str] = &[
    "Pants", "Shirt", "T-Shirt", "Dress", "Jacket", "Skirt", "Shorts", "Sweater", "Saree",
    "Kurta", "Suit",
];

impl OutfitBoard {
    pub fn new(outfits: Vec<Outfit>) -> Self {
        Self {
            outfits,
            ..Default::default()
        }
    }

    pub fn outfits(&self) -> &[Outfit] {
        &self.outfits
    }

    /// Adds the results of a "see more" request.
    pub fn append(&mut self, more: Vec<Outfit>) {
        self.outfits.extend(more);
    }

    pub fn existing_titles(&self) -> Vec<String> {
        self.outfits.iter().map(|o| o.summary().to_string()).collect()
    }

    /// Distinct occasions across all outfits, in first-seen order.
    pub fn available_occasions(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for occasion in self.outfits.iter().flat_map(|o| o.occasion_fit.iter()) {
            if !seen.contains(&occasion.as_str()) {
                seen.push(occasion);
            }
        }
        seen
    }

    pub fn filtered(&self) -> Vec<&Outfit> {
        if self.occasion_filters.is_empty() {
            return self.outfits.iter().collect();
        }
        self.outfits
            .iter()
            .filter(|o| {
                self.occasion_filters
                    .iter()
                    .any(|f| o.occasion_fit.contains(f))
            })
            .collect()
    }

    pub fn clothing_filters(&self) -> &[String] {
        &self.clothing_filters
    }

    pub fn occasion_filters(&self) -> &[String] {
        &self.occasion_filters
    }

    /// Returns `false`, leaving the selection as is, for an item outside
    /// [`CLOTHING_FILTERS`].
    pub fn toggle_clothing_filter(&mut self, filter: &str) -> bool {
        if !CLOTHING_FILTERS.contains(&filter) {
            return false;
        }
        toggle(&mut self.clothing_filters, filter);
        true
    }

    pub fn toggle_occasion_filter(&mut self, occasion: &str) {
        toggle(&mut self.occasion_filters, occasion);
    }

    pub fn filters_active(&self) -> bool {
        !self.clothing_filters.is_empty() || !self.occasion_filters.is_empty()
    }

    pub fn clear_filters(&mut self) {
        self.clothing_filters.clear();
        self.occasion_filters.clear();
    }
}

/// Saved-state lookup is by title only.
pub fn is_saved(outfit: &Outfit, saved: &[Outfit]) -> bool {
    saved.iter().any(|s| s.style_title == outfit.style_title)
}

fn toggle(set: &mut Vec<String>, value: &str) {
    if let Some(pos) = set.iter().position(|v| v == value) {
        set.remove(pos);
    } else {
        set.push(value.to_string());
    }
}
