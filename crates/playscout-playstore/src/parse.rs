//! Parsers for suggestion payloads, search result pages and app detail pages.

use crate::error::{PlayStoreError, Result};
use playscout_core::{AppId, CatalogItem, Timestamp};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;
use url::Url;

fn selector(cell: &'static OnceLock<Selector>, css: &str) -> &'static Selector {
    cell.get_or_init(|| Selector::parse(css).expect("valid selector"))
}

fn parse_error(context: &str, message: impl Into<String>) -> PlayStoreError {
    PlayStoreError::Parse {
        context: context.to_string(),
        message: message.into(),
    }
}

/// Parse a suggestion payload.
///
/// The service answers with a JSON array whose entries are either plain strings
/// or objects carrying the phrase under `"s"`. Blank phrases are dropped.
pub fn parse_suggestions(body: &str) -> Result<Vec<String>> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| parse_error("suggestions", e.to_string()))?;

    let entries = value
        .as_array()
        .ok_or_else(|| parse_error("suggestions", "expected a JSON array"))?;

    let suggestions = entries
        .iter()
        .filter_map(|entry| match entry {
            Value::String(s) => Some(s.as_str()),
            Value::Object(map) => map.get("s").and_then(Value::as_str),
            _ => None,
        })
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    Ok(suggestions)
}

/// Extract up to `n_hits` unique app stubs from a search result page, in page order.
///
/// Each stub carries its id, the title shown on the result card (when present),
/// the canonical detail URL and the term that produced it.
pub fn parse_search_page(
    html: &str,
    base_url: &Url,
    term: &str,
    n_hits: usize,
) -> Result<Vec<CatalogItem>> {
    static LINK: OnceLock<Selector> = OnceLock::new();

    let document = Html::parse_document(html);
    let mut items: Vec<CatalogItem> = Vec::new();
    let mut positions: HashMap<AppId, usize> = HashMap::new();

    for anchor in document.select(selector(&LINK, r#"a[href*="details?id="]"#)) {
        let Some(id) = anchor
            .value()
            .attr("href")
            .and_then(|href| app_id_from_href(base_url, href))
        else {
            continue;
        };

        let title = card_title(&anchor);

        if let Some(&index) = positions.get(&id) {
            if items[index].title.is_none() {
                items[index].title = title;
            }
            continue;
        }

        if items.len() >= n_hits {
            continue;
        }

        let mut item = CatalogItem::new(id.clone()).with_source_term(term);
        item.title = title;
        item.url = Some(detail_url(base_url, &id)?.to_string());
        positions.insert(id, items.len());
        items.push(item);
    }

    tracing::debug!(term = %term, hits = items.len(), "parsed search page");
    Ok(items)
}

fn app_id_from_href(base_url: &Url, href: &str) -> Option<AppId> {
    let url = base_url.join(href).ok()?;
    if !url.path().ends_with("/store/apps/details") {
        return None;
    }
    let (_, id) = url.query_pairs().find(|(key, _)| key == "id")?;
    AppId::new(id.into_owned()).ok()
}

fn card_title(anchor: &ElementRef<'_>) -> Option<String> {
    static SPAN: OnceLock<Selector> = OnceLock::new();

    if let Some(label) = anchor.value().attr("aria-label") {
        let label = label.trim();
        if !label.is_empty() {
            return Some(label.to_string());
        }
    }

    anchor
        .select(selector(&SPAN, "span"))
        .map(|span| span.text().collect::<String>().trim().to_string())
        .find(|text| !text.is_empty())
        .or_else(|| {
            let text = anchor.text().collect::<String>().trim().to_string();
            (!text.is_empty()).then_some(text)
        })
}

/// Canonical detail page URL for an id. `base_url` must end in a slash.
pub fn detail_url(base_url: &Url, id: &AppId) -> Result<Url> {
    let mut url = base_url.join("store/apps/details")?;
    url.query_pairs_mut().append_pair("id", id.as_str());
    Ok(url)
}

/// Parse an app detail page into a full catalog record.
///
/// Structured data (`application/ld+json`) is preferred; the page heading and
/// meta description are used when it is missing. The structured payload is kept
/// as the item's raw payload.
pub fn parse_detail_page(html: &str, id: &AppId, page_url: &str) -> Result<CatalogItem> {
    static LD_JSON: OnceLock<Selector> = OnceLock::new();
    static HEADING: OnceLock<Selector> = OnceLock::new();
    static META_DESCRIPTION: OnceLock<Selector> = OnceLock::new();

    let document = Html::parse_document(html);

    let structured = document
        .select(selector(&LD_JSON, r#"script[type="application/ld+json"]"#))
        .filter_map(|script| serde_json::from_str::<Value>(&script.text().collect::<String>()).ok())
        .find_map(|value| find_application(&value).cloned());

    let mut item = CatalogItem::new(id.clone());

    if let Some(app) = &structured {
        item.title = string_field(app, "name");
        item.description = string_field(app, "description");
        item.genre = string_field(app, "applicationCategory");
        item.url = string_field(app, "url");
        item.developer = first_object(app.get("author")).and_then(|a| string_field(a, "name"));

        if let Some(rating) = app.get("aggregateRating") {
            item.score = rating.get("ratingValue").and_then(number_as_f64);
            item.ratings = rating.get("ratingCount").and_then(number_as_u64);
        }

        item.price = first_object(app.get("offers"))
            .and_then(|offer| offer.get("price"))
            .and_then(number_as_f64);
    }

    if item.title.is_none() {
        item.title = document
            .select(selector(&HEADING, "h1"))
            .map(|h| h.text().collect::<String>().trim().to_string())
            .find(|text| !text.is_empty());
    }

    if item.description.is_none() {
        item.description = document
            .select(selector(&META_DESCRIPTION, r#"meta[name="description"]"#))
            .filter_map(|meta| meta.value().attr("content"))
            .map(|content| content.trim().to_string())
            .find(|content| !content.is_empty());
    }

    if item.title.is_none() && structured.is_none() {
        return Err(parse_error(
            "detail page",
            format!("no title or structured data for {id}"),
        ));
    }

    item.installs = installs_from_html(html);
    if item.url.is_none() {
        item.url = Some(page_url.to_string());
    }
    item.fetched_at = Some(Timestamp::now());
    item.raw = structured;

    Ok(item)
}

fn find_application(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(values) => values.iter().find_map(find_application),
        Value::Object(map) => {
            let is_app = match map.get("@type") {
                Some(Value::String(kind)) => kind.ends_with("Application"),
                Some(Value::Array(kinds)) => kinds
                    .iter()
                    .filter_map(Value::as_str)
                    .any(|kind| kind.ends_with("Application")),
                _ => false,
            };
            if is_app {
                Some(value)
            } else {
                map.get("@graph").and_then(find_application)
            }
        }
        _ => None,
    }
}

fn first_object(value: Option<&Value>) -> Option<&Value> {
    match value? {
        Value::Array(values) => values.first(),
        other => Some(other),
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn number_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

fn number_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

fn installs_from_html(html: &str) -> Option<String> {
    static INSTALLS: OnceLock<Regex> = OnceLock::new();
    let regex = INSTALLS.get_or_init(|| {
        Regex::new(r">\s*([0-9][0-9,.]*[KMB]?\+)\s*</div>\s*<div[^>]*>\s*Downloads")
            .expect("valid regex")
    });
    regex
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
