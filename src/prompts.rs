//! Instruction template and prompt assembly for recipe extraction.
//!
//! Every prompt is rendered from one fixed template, identified by
//! [`PROMPT_TEMPLATE_VERSION`]. Rendering is a pure function of the caller
//! preferences and the payload, so the same inputs always produce
//! byte-identical prompt text. Bump the version whenever the template
//! wording changes.
//!
//! The template asks for a bare JSON object. Models do not always comply,
//! which is why [`crate::pipeline::postprocess`] strips fences and validates
//! instead of trusting the answer.

use crate::config::ExtractionPreferences;
use edgequake_llm::ImageData;

/// Version tag of [`RECIPE_TEMPLATE`].
pub const PROMPT_TEMPLATE_VERSION: &str = "recipe-v3";

/// Advisory tag vocabulary embedded in the prompt.
///
/// Entries are lower-case; [`crate::pipeline::postprocess`] compares
/// case-insensitively.
pub const TAG_VOCABULARY: &[&str] = &[
    "breakfast",
    "brunch",
    "lunch",
    "dinner",
    "dessert",
    "snack",
    "appetizer",
    "side dish",
    "main course",
    "soup",
    "salad",
    "sandwich",
    "drink",
    "sauce",
    "bread",
    "baking",
    "grilling",
    "slow cooker",
    "one-pot",
    "no-cook",
    "quick",
    "easy",
    "make-ahead",
    "healthy",
    "comfort food",
    "vegan",
    "vegetarian",
    "gluten-free",
    "dairy-free",
    "low-carb",
    "high-protein",
    "kid-friendly",
    "chicken",
    "beef",
    "pork",
    "seafood",
    "pasta",
    "rice",
    "italian",
    "mexican",
    "asian",
    "indian",
    "mediterranean",
    "french",
    "american",
    "middle eastern",
];

/// The fixed instruction template.
///
/// Placeholders: `{tags}` (comma-separated vocabulary) and
/// `{localisation}` (the language/units clause).
pub const RECIPE_TEMPLATE: &str = r#"You are a culinary data extractor. You will be given the content of a cooking recipe, either as text scraped from a web page or as a photograph. Extract the recipe as structured data.

1. FIELDS
   - title: the recipe name (string)
   - ingredients: list of short strings, one ingredient each, with quantity and unit
   - steps: list of short strings, each one a single action, in cooking order
   - tags: list of 3 to 5 keywords chosen from the allowed tags below
   - image_url: URL of the finished dish if it appears in the content, otherwise null

2. ALLOWED TAGS
   {tags}

3. LANGUAGE AND UNITS
   {localisation}

4. WHAT TO IGNORE
   - Navigation, advertising, comments, author biographies and related-recipe links
   - Nutrition panels and ratings

5. EXAMPLE
   {"title":"Garlic Butter Pasta","ingredients":["200 g spaghetti","2 cloves garlic, minced","30 g butter"],"steps":["Boil the spaghetti in salted water until al dente.","Melt the butter in a pan.","Fry the garlic in the butter for 1 minute.","Toss the drained spaghetti in the garlic butter."],"tags":["dinner","pasta","quick","vegetarian"],"image_url":null}

6. OUTPUT FORMAT
   - Output ONLY one JSON object with exactly the fields above
   - Do NOT wrap the JSON in ``` fences
   - Do NOT add commentary or explanations before or after the JSON"#;

/// Marker appended instead of page text when the recipe is a photograph.
pub const IMAGE_PAYLOAD_MARKER: &str =
    "The recipe is in the attached image. Read every visible ingredient and instruction.";

/// What the model is asked to read.
#[derive(Debug, Clone)]
pub enum Payload {
    /// Cleaned page text (already cut to the configured content limit).
    Text(String),
    /// Normalised, base64-encoded photograph.
    Image(ImageData),
}

/// Everything needed to render one prompt.
#[derive(Debug, Clone)]
pub struct ExtractionContext {
    pub preferences: ExtractionPreferences,
    pub payload: Payload,
}

/// A fully-resolved prompt ready for submission.
#[derive(Debug, Clone)]
pub struct PromptDocument {
    /// Instruction text followed by the payload section.
    pub text: String,
    /// Attached photograph, for the image path.
    pub image: Option<ImageData>,
}

/// Render the language/units clause.
pub fn localisation_clause(prefs: &ExtractionPreferences) -> String {
    format!(
        "- Write the title, ingredients and steps in {language}, translating if the source uses another language\n   \
         - Express every quantity in {units} units, converting amounts and oven temperatures where needed\n   \
         - Keep tags in English exactly as listed above",
        language = prefs.language,
        units = prefs.units,
    )
}

/// Render the instruction part of the prompt (everything except the payload).
pub fn render_instructions(prefs: &ExtractionPreferences) -> String {
    RECIPE_TEMPLATE
        .replace("{tags}", &TAG_VOCABULARY.join(", "))
        .replace("{localisation}", &localisation_clause(prefs))
}

/// Build the prompt for scraped page text.
pub fn build_text_prompt(prefs: &ExtractionPreferences, text: &str) -> String {
    format!(
        "{}\n\nHere is the recipe content:\n---\n{}\n---\nNow respond only with the JSON object.",
        render_instructions(prefs),
        text
    )
}

/// Build the prompt text for a photographed recipe.
pub fn build_image_prompt(prefs: &ExtractionPreferences) -> String {
    format!(
        "{}\n\n{}\nNow respond only with the JSON object.",
        render_instructions(prefs),
        IMAGE_PAYLOAD_MARKER
    )
}

/// Assemble the [`PromptDocument`] for an extraction context.
pub fn build_prompt(ctx: ExtractionContext) -> PromptDocument {
    match ctx.payload {
        Payload::Text(text) => PromptDocument {
            text: build_text_prompt(&ctx.preferences, &text),
            image: None,
        },
        Payload::Image(image) => PromptDocument {
            text: build_image_prompt(&ctx.preferences),
            image: Some(image),
        },
    }
}
