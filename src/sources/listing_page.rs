use crate::config::DEFAULT_LISTING_URL;
use crate::scrapers::fields::{header_index, listing_rows, lookup_str, Field};
use crate::scrapers::http::{HttpClient, RequestPacer};
use crate::sources::SymbolSource;
use crate::util::first_success;
use async_trait::async_trait;
use log::{debug, info, warn};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;

/// JSON 接口候选地址，按优先级排列
pub const DEFAULT_API_ENDPOINTS: &[&str] = &[
    "https://www.5paisa.com/api/v1/stocks/all",
    "https://www.5paisa.com/api/stocks/list",
    "https://api.5paisa.com/v1/stocks",
];

pub const DEFAULT_MAX_PAGES: usize = 50;

/// Assignments that usually precede an embedded JSON blob in a script tag.
const SCRIPT_JSON_MARKERS: &[&str] = &[
    r"stockData\s*[:=]\s*",
    r"stocks\s*[:=]\s*",
    r"\bdata\s*[:=]\s*",
    r"window\.__INITIAL_STATE__\s*=\s*",
];

const PAGINATION_CONTAINERS: &str =
    ".pagination, .page-nav, nav[class*=pagin], ul[class*=pagin], div[class*=pagin]";
const NEXT_LINK_SELECTORS: &[&str] = &[
    "a[rel=next]",
    "link[rel=next]",
    "a[class*=next]",
    "a[aria-label*=next]",
    "a[aria-label*=Next]",
];
const NEXT_LINK_TEXT: &[&str] = &["next", "›", "»", ">"];

/// One crawled page: candidate symbols plus the next page, if any.
#[derive(Debug, Default, PartialEq)]
pub struct ListingPage {
    pub symbols: Vec<String>,
    pub next_url: Option<String>,
}

/// 股票列表页抓取
///
/// Tries the JSON endpoints first. When none answers with rows, crawls the
/// HTML listing page: embedded script JSON, then `<table>` rows, then
/// symbol-looking `<div>`s, following pagination links up to `max_pages`.
pub struct ListingPageSource {
    http: HttpClient,
    start_url: String,
    api_endpoints: Vec<String>,
    max_pages: usize,
    pacer: RequestPacer,
}

impl ListingPageSource {
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            start_url: DEFAULT_LISTING_URL.to_string(),
            api_endpoints: DEFAULT_API_ENDPOINTS.iter().map(|s| s.to_string()).collect(),
            max_pages: DEFAULT_MAX_PAGES,
            pacer: RequestPacer::new(Duration::from_secs(1)),
        }
    }

    pub fn with_start_url(mut self, url: &str) -> Self {
        self.start_url = url.to_string();
        self
    }

    pub fn with_api_endpoints(mut self, endpoints: Vec<String>) -> Self {
        self.api_endpoints = endpoints;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.pacer = RequestPacer::new(delay);
        self
    }

    async fn from_api(&self) -> Option<Vec<String>> {
        first_success(&self.api_endpoints, move |endpoint| async move {
            debug!("Trying API endpoint: {}", endpoint);
            match self.http.get_json(endpoint, &[]).await {
                Ok(payload) => {
                    let symbols = symbols_from_rows(&payload);
                    if symbols.is_empty() {
                        None
                    } else {
                        info!("Found {} stocks from API {}", symbols.len(), endpoint);
                        Some(symbols)
                    }
                }
                Err(e) => {
                    debug!("API endpoint {} failed: {}", endpoint, e);
                    None
                }
            }
        })
        .await
    }

    async fn crawl(&self) -> Vec<String> {
        let mut symbols = Vec::new();
        let mut next = Some(self.start_url.clone());
        let mut page = 1;

        while let Some(url) = next.take() {
            if page > self.max_pages {
                info!("Reached page limit {}", self.max_pages);
                break;
            }

            self.pacer.wait().await;
            info!("Scraping page {}: {}", page, url);

            let html = match self.http.get_text(&url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!("Failed to fetch page {}: {}", page, e);
                    break;
                }
            };

            let parsed = parse_listing_page(&html, &url);
            if parsed.symbols.is_empty() {
                warn!("No stock data found on page {}", page);
                if page == 1 {
                    break;
                }
            } else {
                info!("Found {} stocks on page {}", parsed.symbols.len(), page);
                symbols.extend(parsed.symbols);
            }

            next = parsed.next_url.filter(|n| *n != url);
            page += 1;
        }

        symbols
    }
}

#[async_trait]
impl SymbolSource for ListingPageSource {
    fn name(&self) -> &'static str {
        "listing-page"
    }

    async fn discover(&self) -> Vec<String> {
        if let Some(symbols) = self.from_api().await {
            return symbols;
        }
        self.crawl().await
    }
}

fn symbols_from_rows(payload: &Value) -> Vec<String> {
    listing_rows(payload)
        .into_iter()
        .filter_map(|row| lookup_str(row, Field::Symbol))
        .collect()
}

/// Depth-first search for the first array of rows that carry a symbol.
fn find_symbol_rows(value: &Value) -> Vec<String> {
    let direct = symbols_from_rows(value);
    if !direct.is_empty() {
        return direct;
    }

    let children: Box<dyn Iterator<Item = &Value> + '_> = match value {
        Value::Object(obj) => Box::new(obj.values()),
        Value::Array(items) => Box::new(items.iter()),
        _ => return Vec::new(),
    };
    for child in children {
        let found = find_symbol_rows(child);
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn script_markers() -> &'static [Regex] {
    static MARKERS: OnceLock<Vec<Regex>> = OnceLock::new();
    MARKERS.get_or_init(|| SCRIPT_JSON_MARKERS.iter().filter_map(|p| Regex::new(p).ok()).collect())
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Parse the first JSON value starting at `text`, ignoring what follows.
fn leading_json(text: &str) -> Option<Value> {
    serde_json::Deserializer::from_str(text)
        .into_iter::<Value>()
        .next()
        .and_then(|v| v.ok())
}

fn symbols_from_scripts(document: &Html) -> Vec<String> {
    if let Some(next_data) = selector("script#__NEXT_DATA__") {
        for script in document.select(&next_data) {
            if let Some(value) = leading_json(&element_text(script)) {
                let found = find_symbol_rows(&value);
                if !found.is_empty() {
                    return found;
                }
            }
        }
    }

    let Some(scripts) = selector("script") else {
        return Vec::new();
    };

    for script in document.select(&scripts) {
        let body = script.text().collect::<String>();
        let lower = body.to_lowercase();
        if !lower.contains("stock") && !lower.contains("symbol") {
            continue;
        }

        for marker in script_markers() {
            for hit in marker.find_iter(&body) {
                if let Some(value) = leading_json(&body[hit.end()..]) {
                    let found = find_symbol_rows(&value);
                    if !found.is_empty() {
                        return found;
                    }
                }
            }
        }
    }

    Vec::new()
}

fn symbols_from_tables(document: &Html) -> Vec<String> {
    let (Some(tables), Some(rows), Some(cells)) = (selector("table"), selector("tr"), selector("th, td")) else {
        return Vec::new();
    };

    let mut symbols = Vec::new();
    for table in document.select(&tables) {
        let table_rows: Vec<ElementRef<'_>> = table.select(&rows).collect();
        if table_rows.len() < 2 {
            continue;
        }

        let headers: Vec<String> = table_rows[0].select(&cells).map(element_text).collect();
        let Some(column) = header_index(&headers, Field::Symbol) else {
            continue;
        };

        for row in &table_rows[1..] {
            let values: Vec<String> = row.select(&cells).map(element_text).collect();
            if values.len() < 2 {
                continue;
            }
            if let Some(value) = values.get(column).filter(|v| !v.is_empty()) {
                symbols.push(value.clone());
            }
        }
    }
    symbols
}

fn symbols_from_divs(document: &Html) -> Vec<String> {
    let Some(divs) = selector("div[class*=stock], div[class*=Stock], div[class*=symbol], div[class*=Symbol]") else {
        return Vec::new();
    };

    document
        .select(&divs)
        .take(10)
        .map(element_text)
        .filter(|text| text.len() > 3 && text.len() < 50)
        .collect()
}

fn resolve_link(base_url: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    let base = Url::parse(base_url).ok()?;
    base.join(href).ok().map(|u| u.to_string())
}

fn next_page_url(document: &Html, base_url: &str) -> Option<String> {
    let containers: Vec<ElementRef<'_>> = selector(PAGINATION_CONTAINERS)
        .map(|sel| document.select(&sel).collect())
        .unwrap_or_default();

    for css in NEXT_LINK_SELECTORS {
        let Some(sel) = selector(css) else { continue };
        let href = if containers.is_empty() {
            document.select(&sel).find_map(|a| a.value().attr("href"))
        } else {
            containers
                .iter()
                .find_map(|c| c.select(&sel).find_map(|a| a.value().attr("href")))
        };
        if let Some(url) = href.and_then(|h| resolve_link(base_url, h)) {
            return Some(url);
        }
    }

    let anchors = selector("a")?;
    containers.iter().find_map(|container| {
        container
            .select(&anchors)
            .filter(|a| NEXT_LINK_TEXT.contains(&element_text(*a).to_lowercase().as_str()))
            .find_map(|a| a.value().attr("href").and_then(|h| resolve_link(base_url, h)))
    })
}

/// Extract candidate symbols and the next-page link from one listing page.
pub fn parse_listing_page(html: &str, base_url: &str) -> ListingPage {
    let document = Html::parse_document(html);

    let mut symbols = symbols_from_scripts(&document);
    if symbols.is_empty() {
        symbols = symbols_from_tables(&document);
    }
    if symbols.is_empty() {
        symbols = symbols_from_divs(&document);
    }

    ListingPage {
        symbols,
        next_url: next_page_url(&document, base_url),
    }
}
