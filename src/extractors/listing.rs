// src/extractors/listing.rs

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Constants ---
/// Placeholder stored when a field cannot be read off the page.
pub const UNKNOWN: &str = "Unknown";

// Locale-specific phrases identifying the relevant detail list items.
const BUILT_IN_MARKER: &str = "Construído em";
const ENERGY_CLASS_MARKER: &str = "Classe energética";
const GROSS_AREA_MARKER: &str = "área bruta";
const UTIL_AREA_MARKER: &str = "úteis";

// --- CSS Selectors (Lazy Static) ---
static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1").expect("Failed to compile TITLE_SELECTOR"));

static ADDRESS_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".main-info__title-minor").expect("Failed to compile ADDRESS_SELECTOR")
});

static PRICE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".info-data-price").expect("Failed to compile PRICE_SELECTOR"));

static LIST_ITEM_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("li").expect("Failed to compile LIST_ITEM_SELECTOR"));

// The rating label sits in the title attribute of the item's second inline child.
static ENERGY_VALUE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("span:nth-child(2)").expect("Failed to compile ENERGY_VALUE_SELECTOR")
});

static THUMBNAIL_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"img[data-orientation="horizontal"]"#)
        .expect("Failed to compile THUMBNAIL_SELECTOR")
});

// --- Regex Patterns for Text Transforms (Lazy Static) ---
static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{4}").expect("Failed to compile YEAR_RE"));

static INTEGER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+").expect("Failed to compile INTEGER_RE"));

static UTIL_AREA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+) m² úteis").expect("Failed to compile UTIL_AREA_RE"));

// --- Data Structures ---
/// One scraped real-estate listing. Field names serialize in camelCase so the
/// persisted JSON matches the shape the browser extension stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    pub id: String,
    pub url: String,
    pub title: String,
    pub address: String,
    pub price: String,
    pub listing_url: String,
    pub year: String,
    pub energy_certificate: String,
    pub gross_area: String,
    pub util_area: String,
    pub thumbnail: String,
    pub added_at: i64,
}

// --- Main Extractor Structure ---
pub struct ListingExtractor;

impl ListingExtractor {
    pub fn new() -> Self {
        Self {}
    }

    /// Extracts a fully-populated record from a parsed listing page.
    ///
    /// Every field rule is best-effort: a missing node or failed pattern
    /// degrades to [`UNKNOWN`] (empty string for the thumbnail), never an
    /// error. `page_url` is the canonical URL of the page the document was
    /// loaded from.
    pub fn extract(&self, document: &Html, page_url: &str) -> ListingRecord {
        tracing::debug!("Extracting listing fields from {}", page_url);

        ListingRecord {
            id: Uuid::new_v4().to_string(),
            url: page_url.to_string(),
            title: or_unknown(self.title(document)),
            address: or_unknown(self.address(document)),
            price: or_unknown(self.price(document)),
            listing_url: page_url.to_string(),
            year: or_unknown(self.year(document)),
            energy_certificate: or_unknown(self.energy_certificate(document)),
            gross_area: or_unknown(self.gross_area(document)),
            util_area: or_unknown(self.util_area(document)),
            thumbnail: self.thumbnail(document),
            added_at: Utc::now().timestamp_millis(),
        }
    }

    /// First heading element's text.
    fn title(&self, document: &Html) -> Option<String> {
        document
            .select(&TITLE_SELECTOR)
            .next()
            .map(element_text)
            .and_then(non_empty)
    }

    fn address(&self, document: &Html) -> Option<String> {
        document
            .select(&ADDRESS_SELECTOR)
            .next()
            .map(element_text)
            .and_then(non_empty)
    }

    /// Price text with the currency symbol stripped, e.g. "€ 250.000" -> "250.000".
    fn price(&self, document: &Html) -> Option<String> {
        document
            .select(&PRICE_SELECTOR)
            .next()
            .map(|element| element_text(element).replace('€', "").trim().to_string())
            .and_then(non_empty)
    }

    /// First 4-digit run in the "Construído em ..." detail item.
    fn year(&self, document: &Html) -> Option<String> {
        self.marked_list_item(document, BUILT_IN_MARKER)
            .and_then(|item| YEAR_RE.find(&element_text(item)).map(|m| m.as_str().to_string()))
    }

    fn energy_certificate(&self, document: &Html) -> Option<String> {
        self.marked_list_item(document, ENERGY_CLASS_MARKER)
            .and_then(|item| item.select(&ENERGY_VALUE_SELECTOR).next())
            .and_then(|span| span.value().attr("title"))
            .map(str::to_string)
            .and_then(non_empty)
    }

    fn gross_area(&self, document: &Html) -> Option<String> {
        self.marked_list_item(document, GROSS_AREA_MARKER)
            .and_then(|item| {
                INTEGER_RE
                    .find(&element_text(item))
                    .map(|m| m.as_str().to_string())
            })
    }

    // A marker hit does not guarantee the full "<n> m² úteis" pattern is
    // present in the same item, so the capture stays guarded.
    fn util_area(&self, document: &Html) -> Option<String> {
        self.marked_list_item(document, UTIL_AREA_MARKER)
            .and_then(|item| {
                UTIL_AREA_RE
                    .captures(&element_text(item))
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().to_string())
            })
    }

    /// `src` of the first horizontally-oriented gallery image; empty when absent.
    fn thumbnail(&self, document: &Html) -> String {
        document
            .select(&THUMBNAIL_SELECTOR)
            .next()
            .and_then(|img| img.value().attr("src"))
            .unwrap_or_default()
            .to_string()
    }

    /// First list item whose text content contains the marker phrase.
    fn marked_list_item<'a>(&self, document: &'a Html, marker: &str) -> Option<ElementRef<'a>> {
        document
            .select(&LIST_ITEM_SELECTOR)
            .find(|item| item.text().collect::<String>().contains(marker))
    }
}

impl Default for ListingExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn element_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn or_unknown(value: Option<String>) -> String {
    value.unwrap_or_else(|| UNKNOWN.to_string())
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_URL: &str = "https://www.idealista.pt/imovel/12345678/";

    fn listing_page() -> Html {
        Html::parse_document(
            r#"
            <!DOCTYPE html>
            <html><head><title>Listing</title></head><body>
            <main class="main-info">
              <h1>Apartamento T3 em Arroios</h1>
              <div class="main-info__title-minor">Rua Morais Soares, Lisboa</div>
              <span class="info-data-price">€ 250.000</span>
            </main>
            <img data-orientation="horizontal" src="https://img.example.com/casa.jpg"/>
            <img src="https://img.example.com/vertical.jpg"/>
            <ul class="details-property">
              <li>Construído em 1998</li>
              <li>Classe energética: <span class="icon-energy"></span><span title="B-">B-</span></li>
              <li>150 m² área bruta</li>
              <li>120 m² úteis</li>
            </ul>
            </body></html>
            "#,
        )
    }

    fn extract(document: &Html) -> ListingRecord {
        ListingExtractor::new().extract(document, PAGE_URL)
    }

    #[test]
    fn extracts_all_fields_from_full_page() {
        let record = extract(&listing_page());

        assert_eq!(record.title, "Apartamento T3 em Arroios");
        assert_eq!(record.address, "Rua Morais Soares, Lisboa");
        assert_eq!(record.price, "250.000");
        assert_eq!(record.year, "1998");
        assert_eq!(record.energy_certificate, "B-");
        assert_eq!(record.gross_area, "150");
        assert_eq!(record.util_area, "120");
        assert_eq!(record.thumbnail, "https://img.example.com/casa.jpg");
        assert_eq!(record.url, PAGE_URL);
        assert_eq!(record.listing_url, PAGE_URL);
        assert!(!record.id.is_empty());
        assert!(record.added_at > 0);
    }

    #[test]
    fn missing_marker_degrades_only_that_field() {
        let document = Html::parse_document(
            r#"
            <body>
            <h1>Moradia em Sintra</h1>
            <ul>
              <li>Classe energética: <span></span><span title="C">C</span></li>
              <li>90 m² área bruta</li>
            </ul>
            </body>
            "#,
        );

        let record = extract(&document);

        assert_eq!(record.year, UNKNOWN);
        assert_eq!(record.util_area, UNKNOWN);
        assert_eq!(record.title, "Moradia em Sintra");
        assert_eq!(record.energy_certificate, "C");
        assert_eq!(record.gross_area, "90");
    }

    #[test]
    fn empty_document_yields_placeholders() {
        let record = extract(&Html::parse_document("<body></body>"));

        assert_eq!(record.title, UNKNOWN);
        assert_eq!(record.address, UNKNOWN);
        assert_eq!(record.price, UNKNOWN);
        assert_eq!(record.year, UNKNOWN);
        assert_eq!(record.energy_certificate, UNKNOWN);
        assert_eq!(record.gross_area, UNKNOWN);
        assert_eq!(record.util_area, UNKNOWN);
        assert_eq!(record.thumbnail, "");
    }

    #[test]
    fn price_strips_currency_symbol_and_whitespace() {
        let document = Html::parse_document(
            r#"<body><span class="info-data-price">€ 250.000</span></body>"#,
        );

        assert_eq!(extract(&document).price, "250.000");
    }

    #[test]
    fn year_takes_first_four_digit_run() {
        let document = Html::parse_document(
            "<body><ul><li>Remodelado</li><li>Construído em 1998</li></ul></body>",
        );

        assert_eq!(extract(&document).year, "1998");
    }

    #[test]
    fn util_area_marker_without_pattern_degrades() {
        // "úteis" appears but the "<n> m² úteis" pattern does not.
        let document = Html::parse_document(
            "<body><ul><li>Áreas úteis por confirmar</li></ul></body>",
        );

        assert_eq!(extract(&document).util_area, UNKNOWN);
    }

    #[test]
    fn thumbnail_requires_horizontal_orientation() {
        let document = Html::parse_document(
            r#"<body><img src="https://img.example.com/vertical.jpg"/></body>"#,
        );

        assert_eq!(extract(&document).thumbnail, "");
    }

    #[test]
    fn each_extraction_generates_a_fresh_id() {
        let document = listing_page();
        let first = extract(&document);
        let second = extract(&document);

        assert_ne!(first.id, second.id);
    }
}
