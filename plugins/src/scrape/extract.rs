//! Product extraction from raw HTML.
//!
//! Structured data wins: a JSON-LD `Product` block fills whatever it carries.
//! Markup heuristics (title tags, price and rating patterns, feature bullets)
//! only fill the fields that are still empty afterwards.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use scout_core::api::ProductData;

const MAX_FEATURES: usize = 5;
const MAX_DESCRIPTION_CHARS: usize = 500;
const MAX_IMAGES: usize = 5;

static LD_JSON_REGEX: OnceLock<Regex> = OnceLock::new();
static TITLE_REGEX: OnceLock<Regex> = OnceLock::new();
static PRODUCT_TITLE_REGEX: OnceLock<Regex> = OnceLock::new();
static H1_REGEX: OnceLock<Regex> = OnceLock::new();
static META_REGEX: OnceLock<Regex> = OnceLock::new();
static ITEMPROP_PRICE_REGEX: OnceLock<Regex> = OnceLock::new();
static PRICE_REGEX: OnceLock<Regex> = OnceLock::new();
static RATING_REGEX: OnceLock<Regex> = OnceLock::new();
static REVIEW_COUNT_REGEX: OnceLock<Regex> = OnceLock::new();
static FEATURE_BLOCK_REGEX: OnceLock<Regex> = OnceLock::new();
static LI_REGEX: OnceLock<Regex> = OnceLock::new();
static TAG_REGEX: OnceLock<Regex> = OnceLock::new();
static SPACE_REGEX: OnceLock<Regex> = OnceLock::new();

fn ld_json_regex() -> &'static Regex {
    LD_JSON_REGEX.get_or_init(|| {
        Regex::new(r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
            .expect("LD_JSON_REGEX is valid")
    })
}

fn title_regex() -> &'static Regex {
    TITLE_REGEX.get_or_init(|| {
        Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("TITLE_REGEX is valid")
    })
}

fn product_title_regex() -> &'static Regex {
    PRODUCT_TITLE_REGEX.get_or_init(|| {
        Regex::new(r#"(?is)<[a-z0-9]+[^>]*id\s*=\s*["']productTitle["'][^>]*>(.*?)</"#)
            .expect("PRODUCT_TITLE_REGEX is valid")
    })
}

fn h1_regex() -> &'static Regex {
    H1_REGEX.get_or_init(|| Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").expect("H1_REGEX is valid"))
}

fn meta_regex() -> &'static Regex {
    META_REGEX.get_or_init(|| {
        Regex::new(r#"(?is)<meta\s+[^>]*?(?:property|name)\s*=\s*["']([^"']+)["'][^>]*?content\s*=\s*["']([^"']*)["']"#)
            .expect("META_REGEX is valid")
    })
}

fn itemprop_price_regex() -> &'static Regex {
    ITEMPROP_PRICE_REGEX.get_or_init(|| {
        Regex::new(r#"(?is)itemprop\s*=\s*["']price["'][^>]*?content\s*=\s*["']([0-9][0-9.,]*)["']"#)
            .expect("ITEMPROP_PRICE_REGEX is valid")
    })
}

fn price_regex() -> &'static Regex {
    PRICE_REGEX.get_or_init(|| {
        Regex::new(r"[$€£]\s?\d{1,3}(?:,\d{3})*(?:\.\d{2})?").expect("PRICE_REGEX is valid")
    })
}

fn rating_regex() -> &'static Regex {
    RATING_REGEX.get_or_init(|| {
        Regex::new(r"(?i)(\d(?:\.\d{1,2})?)\s*out of\s*5").expect("RATING_REGEX is valid")
    })
}

fn review_count_regex() -> &'static Regex {
    REVIEW_COUNT_REGEX.get_or_init(|| {
        Regex::new(r"(?i)(\d[\d,]*)\s+(?:global\s+)?(?:ratings|reviews|customer reviews)")
            .expect("REVIEW_COUNT_REGEX is valid")
    })
}

fn feature_block_regex() -> &'static Regex {
    FEATURE_BLOCK_REGEX.get_or_init(|| {
        Regex::new(r#"(?is)id\s*=\s*["']feature-bullets["'](.*?)</ul>"#)
            .expect("FEATURE_BLOCK_REGEX is valid")
    })
}

fn li_regex() -> &'static Regex {
    LI_REGEX.get_or_init(|| Regex::new(r"(?is)<li[^>]*>(.*?)</li>").expect("LI_REGEX is valid"))
}

fn tag_regex() -> &'static Regex {
    TAG_REGEX.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("TAG_REGEX is valid"))
}

fn space_regex() -> &'static Regex {
    SPACE_REGEX.get_or_init(|| Regex::new(r"\s+").expect("SPACE_REGEX is valid"))
}

/// Strip tags, decode the common entities and collapse whitespace.
pub fn clean_text(fragment: &str) -> String {
    let stripped = tag_regex().replace_all(fragment, " ");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">");
    space_regex().replace_all(decoded.trim(), " ").into_owned()
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn truncate_chars(text: String, max: usize) -> String {
    if text.chars().count() <= max {
        text
    } else {
        text.chars().take(max).collect()
    }
}

/// Text of the document `<title>`.
pub fn page_title(html: &str) -> Option<String> {
    title_regex()
        .captures(html)
        .and_then(|c| non_empty(clean_text(&c[1])))
}

fn meta_content(html: &str, key: &str) -> Option<String> {
    meta_regex()
        .captures_iter(html)
        .find(|c| c[1].eq_ignore_ascii_case(key))
        .and_then(|c| non_empty(clean_text(&c[2])))
}

/// Extract whatever product fields the page exposes.
pub fn extract_product(url: &str, html: &str) -> ProductData {
    let mut product = ProductData::new(url);

    if let Some(ld) = find_ld_product(html) {
        apply_ld_product(&mut product, &ld);
    }
    apply_markup(&mut product, html);
    product
}

fn find_ld_product(html: &str) -> Option<Value> {
    ld_json_regex()
        .captures_iter(html)
        .filter_map(|c| serde_json::from_str::<Value>(c[1].trim()).ok())
        .find_map(|value| find_product_node(&value))
}

fn is_product_type(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(t)) => t.eq_ignore_ascii_case("product"),
        Some(Value::Array(types)) => types
            .iter()
            .any(|t| t.as_str().is_some_and(|t| t.eq_ignore_ascii_case("product"))),
        _ => false,
    }
}

fn find_product_node(value: &Value) -> Option<Value> {
    match value {
        Value::Array(items) => items.iter().find_map(find_product_node),
        Value::Object(map) => {
            if is_product_type(value) {
                return Some(value.clone());
            }
            map.get("@graph").and_then(find_product_node)
        }
        _ => None,
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(clean_text(s)),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

fn apply_ld_product(product: &mut ProductData, ld: &Value) {
    product.title = ld.get("name").and_then(value_text);
    product.description = ld
        .get("description")
        .and_then(value_text)
        .map(|d| truncate_chars(d, MAX_DESCRIPTION_CHARS));

    product.brand = match ld.get("brand") {
        Some(Value::Object(brand)) => brand.get("name").and_then(value_text),
        Some(other) => value_text(other),
        None => None,
    };

    product.images = match ld.get("image") {
        Some(Value::Array(images)) => images
            .iter()
            .filter_map(|img| match img {
                Value::Object(obj) => obj.get("url").and_then(value_text),
                other => value_text(other),
            })
            .take(MAX_IMAGES)
            .collect(),
        Some(other) => value_text(other).into_iter().collect(),
        None => Vec::new(),
    };

    let offer = match ld.get("offers") {
        Some(Value::Array(offers)) => offers.first(),
        Some(offer @ Value::Object(_)) => Some(offer),
        _ => None,
    };
    if let Some(offer) = offer {
        let price = offer
            .get("price")
            .or_else(|| offer.get("lowPrice"))
            .and_then(value_text);
        let currency = offer.get("priceCurrency").and_then(value_text);
        product.price = match (price, currency) {
            (Some(price), Some(currency)) => Some(format!("{price} {currency}")),
            (price, _) => price,
        };
        product.availability = offer
            .get("availability")
            .and_then(value_text)
            .map(|a| a.rsplit('/').next().unwrap_or_default().to_string());
    }

    if let Some(rating) = ld.get("aggregateRating") {
        product.rating = rating
            .get("ratingValue")
            .and_then(value_f64)
            .filter(|r| (0.0..=5.0).contains(r));
        product.review_count = rating
            .get("reviewCount")
            .or_else(|| rating.get("ratingCount"))
            .and_then(value_u64);
    }
}

fn apply_markup(product: &mut ProductData, html: &str) {
    if product.title.is_none() {
        product.title = product_title_regex()
            .captures(html)
            .and_then(|c| non_empty(clean_text(&c[1])))
            .or_else(|| meta_content(html, "og:title"))
            .or_else(|| h1_regex().captures(html).and_then(|c| non_empty(clean_text(&c[1]))))
            .or_else(|| page_title(html));
    }

    if product.price.is_none() {
        product.price = itemprop_price_regex()
            .captures(html)
            .map(|c| c[1].to_string())
            .or_else(|| meta_content(html, "product:price:amount"))
            .or_else(|| price_regex().find(html).map(|m| m.as_str().replace(' ', "")));
    }

    if product.rating.is_none() {
        product.rating = rating_regex()
            .captures(html)
            .and_then(|c| c[1].parse::<f64>().ok())
            .filter(|r| (0.0..=5.0).contains(r));
    }

    if product.review_count.is_none() {
        product.review_count = review_count_regex()
            .captures(html)
            .and_then(|c| c[1].replace(',', "").parse().ok());
    }

    if product.features.is_empty() {
        if let Some(block) = feature_block_regex().captures(html) {
            product.features = li_regex()
                .captures_iter(&block[1])
                .filter_map(|c| non_empty(clean_text(&c[1])))
                .take(MAX_FEATURES)
                .collect();
        }
    }

    if product.description.is_none() {
        product.description = meta_content(html, "og:description")
            .or_else(|| meta_content(html, "description"))
            .map(|d| truncate_chars(d, MAX_DESCRIPTION_CHARS));
    }

    if product.images.is_empty() {
        product.images = meta_content(html, "og:image").into_iter().collect();
    }
}
