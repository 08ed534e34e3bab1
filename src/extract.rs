use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, error};

use crate::config::AppConfig;
use crate::models::ExtractionResult;

// ── Constants ────────────────────────────────────────────────────────────────

/// Tried in order; the first selector with any match wins.
const CONTAINER_SELECTORS: &[&str] = &[
    "article",
    r#"div[class*="article"]"#,
    r#"div[class*="content"]"#,
    r#"div[class*="post"]"#,
    "main",
];

/// Subtrees dropped from the container before its paragraphs are read.
const STRIPPED_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "iframe", "form", "button",
];

// ── Lazy statics ─────────────────────────────────────────────────────────────

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static H1_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());

static CONTAINER_SELS: Lazy<Vec<Selector>> = Lazy::new(|| {
    CONTAINER_SELECTORS
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Request(String),
    #[error("upstream returned {0}")]
    Upstream(reqwest::StatusCode),
    #[error("could not find article content")]
    NoContainer,
}

// ── Extractor ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Extractor {
    user_agent: String,
    timeout: Duration,
}

impl Extractor {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: config.fetch_timeout,
        }
    }

    /// Fetches `url` and pulls out its title and article text.
    ///
    /// Never fails: any fetch or parse problem is logged and yields an empty
    /// [`ExtractionResult`].
    pub async fn extract(&self, url: &str) -> ExtractionResult {
        let outcome = match self.fetch_html(url).await {
            Ok(html) => extract_from_html(&html),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(result) => {
                debug!(url, title = %result.title, chars = result.body.len(), "extracted article");
                result
            }
            Err(e) => {
                error!(url, error = %e, "error extracting article");
                ExtractionResult::default()
            }
        }
    }

    async fn fetch_html(&self, url: &str) -> Result<String, ExtractionError> {
        let client = reqwest::ClientBuilder::new()
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .build()
            .map_err(|e| ExtractionError::Request(e.to_string()))?;

        let response = client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ExtractionError::Timeout(self.timeout)
            } else if e.is_connect() {
                ExtractionError::Request(format!("ConnectError: {}", e))
            } else {
                ExtractionError::Request(format!("RequestError: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::Upstream(status));
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                ExtractionError::Timeout(self.timeout)
            } else {
                ExtractionError::Request(e.to_string())
            }
        })
    }
}

// ── Extraction pipeline ──────────────────────────────────────────────────────

pub fn extract_from_html(html: &str) -> Result<ExtractionResult, ExtractionError> {
    let document = Html::parse_document(html);

    let title = document
        .select(&H1_SEL)
        .next()
        .map(|h1| h1.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let container = find_container(&document).ok_or(ExtractionError::NoContainer)?;

    let mut paragraphs = Vec::new();
    collect_paragraphs(container, &mut paragraphs);

    Ok(ExtractionResult {
        title,
        body: normalize_whitespace(&paragraphs.join(" ")),
    })
}

fn find_container(document: &Html) -> Option<ElementRef<'_>> {
    CONTAINER_SELS
        .iter()
        .find_map(|sel| document.select(sel).next())
}

// ── DOM helpers ──────────────────────────────────────────────────────────────

fn is_stripped(el: ElementRef<'_>) -> bool {
    STRIPPED_TAGS.contains(&el.value().name())
}

/// Pushes the trimmed text of every `<p>` under `el`, skipping stripped subtrees.
fn collect_paragraphs(el: ElementRef<'_>, out: &mut Vec<String>) {
    for child in el.children() {
        let Some(child_el) = ElementRef::wrap(child) else {
            continue;
        };
        if is_stripped(child_el) {
            continue;
        }
        if child_el.value().name() == "p" {
            out.push(collect_text(child_el).trim().to_string());
        } else {
            collect_paragraphs(child_el, out);
        }
    }
}

/// Recursively collect text from an element, ignoring stripped descendants.
fn collect_text(el: ElementRef<'_>) -> String {
    use scraper::node::Node;
    let mut text = String::new();
    for child in el.children() {
        match child.value() {
            Node::Text(t) => text.push_str(&*t.text),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    if !is_stripped(child_el) {
                        text.push_str(&collect_text(child_el));
                    }
                }
            }
            _ => {}
        }
    }
    text
}

fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}
