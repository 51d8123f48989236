//! Result merging: reconcile the model's image link with the scraped one.
//!
//! The model's value wins when it gave one. Otherwise the page's own
//! preview/content image is used. With neither, the field stays absent;
//! no link is ever invented.

use crate::output::ExtractedRecipe;
use tracing::debug;

/// Fill `recipe.image_url` from `fallback` when the model left it empty.
///
/// `fallback` is the scraped image link for the URL path and `None` for
/// uploaded photos.
pub fn merge_image_url(mut recipe: ExtractedRecipe, fallback: Option<&str>) -> ExtractedRecipe {
    if recipe.image_url.is_none() {
        if let Some(url) = fallback.map(str::trim).filter(|u| !u.is_empty()) {
            debug!("Model gave no image; using scraped {}", url);
            recipe.image_url = Some(url.to_string());
        }
    }
    recipe
}
