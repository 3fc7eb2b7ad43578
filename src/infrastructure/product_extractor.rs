//! Selector-based product field extraction
//!
//! Pulls structured fields out of a rendered product page. Extraction is
//! best-effort by contract: a selector that matches nothing yields an empty
//! value, never an error, so one odd page layout cannot fail a scrape.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use crate::domain::job::ExtractedFields;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static PRICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[$€£¥]\s*\d[\d,]*(?:\.\d+)?").expect("valid regex"));

/// CSS selector lists for one retailer page layout, most specific first.
/// Amazon-style selectors ship as the default; other layouts plug in here.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub title: Vec<String>,
    pub price: Vec<String>,
    pub images: Vec<String>,
    pub description: Vec<String>,
    pub rating: Vec<String>,
    pub reviews: Vec<String>,
    /// Cap on collected review snippets per page.
    pub max_reviews: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            title: vec![
                "#productTitle".to_string(),
                "h1.product-title".to_string(),
                "h1[itemprop='name']".to_string(),
            ],
            price: vec![
                "#priceblock_ourprice".to_string(),
                ".a-price .a-offscreen".to_string(),
                "[itemprop='price']".to_string(),
                ".price".to_string(),
            ],
            images: vec![
                "#landingImage".to_string(),
                "#imgTagWrapperId img".to_string(),
                ".product-image img".to_string(),
            ],
            description: vec![
                "#productDescription".to_string(),
                "#feature-bullets".to_string(),
                "[itemprop='description']".to_string(),
                ".product-description".to_string(),
            ],
            rating: vec![
                "#acrPopover .a-icon-alt".to_string(),
                "[itemprop='ratingValue']".to_string(),
                ".rating".to_string(),
            ],
            reviews: vec![
                "[data-hook='review-body'] span".to_string(),
                ".review-text-content span".to_string(),
                ".review-text".to_string(),
            ],
            max_reviews: 10,
        }
    }
}

pub struct ProductExtractor {
    config: ExtractorConfig,
}

impl ProductExtractor {
    pub fn new() -> Self {
        Self::with_config(ExtractorConfig::default())
    }

    pub fn with_config(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Extract all fields from a page. `fallback_title` (the document title)
    /// stands in when no title element matches.
    pub fn extract(&self, html: &str, fallback_title: &str) -> ExtractedFields {
        let document = Html::parse_document(html);

        let title = first_text(&document, &self.config.title)
            .unwrap_or_else(|| fallback_title.trim().to_string());
        let price = first_text(&document, &self.config.price)
            .map(|raw| normalize_price(&raw))
            .unwrap_or_default();
        let images = collect_attrs(&document, &self.config.images, "src");
        let description = first_text(&document, &self.config.description).unwrap_or_default();
        let rating = first_text(&document, &self.config.rating).unwrap_or_default();
        let reviews = collect_texts(&document, &self.config.reviews, self.config.max_reviews);

        debug!(
            title_found = !title.is_empty(),
            price_found = !price.is_empty(),
            images = images.len(),
            reviews = reviews.len(),
            "field extraction finished"
        );

        ExtractedFields {
            title,
            price,
            images,
            description,
            rating,
            reviews,
        }
    }
}

impl Default for ProductExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Text of the first element matched by the first selector that hits.
fn first_text(document: &Html, selectors: &[String]) -> Option<String> {
    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let text = clean_text(&element.text().collect::<String>());
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// Attribute values from every element the selector list matches, deduped.
fn collect_attrs(document: &Html, selectors: &[String], attr: &str) -> Vec<String> {
    let mut values = Vec::new();
    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        for element in document.select(&selector) {
            if let Some(value) = element.value().attr(attr) {
                let value = value.trim();
                if !value.is_empty() && !values.iter().any(|v| v == value) {
                    values.push(value.to_string());
                }
            }
        }
    }
    values
}

fn collect_texts(document: &Html, selectors: &[String], max: usize) -> Vec<String> {
    let mut texts = Vec::new();
    for raw in selectors {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        for element in document.select(&selector) {
            if texts.len() >= max {
                return texts;
            }
            let text = clean_text(&element.text().collect::<String>());
            if !text.is_empty() && !texts.iter().any(|t| t == &text) {
                texts.push(text);
            }
        }
    }
    texts
}

fn clean_text(raw: &str) -> String {
    WHITESPACE_RE.replace_all(raw.trim(), " ").into_owned()
}

/// Keep the first currency-looking amount when present, otherwise the
/// cleaned raw text ("N/A", "See price in cart", ...).
fn normalize_price(raw: &str) -> String {
    match PRICE_RE.find(raw) {
        Some(m) => m.as_str().to_string(),
        None => clean_text(raw),
    }
}
