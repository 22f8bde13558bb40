use garde::Validate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::document::{Document, DocumentMetadata};

/// Body of POST /v1/scrape. Schema-validated before it reaches the
/// orchestrator.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRequest {
    #[garde(custom(is_http_url))]
    pub url: String,

    /// Caller-supplied wait bound in milliseconds. Falls back to the
    /// configured default when absent; clamped to the configured ceiling.
    #[garde(inner(range(min = 1_000, max = 300_000)))]
    #[serde(default)]
    pub timeout: Option<u64>,

    #[garde(skip)]
    #[serde(default = "default_origin")]
    pub origin: String,

    #[garde(skip)]
    #[serde(default)]
    pub page_options: PageOptions,
}

fn default_origin() -> String {
    "api".to_string()
}

fn is_http_url(value: &str, _ctx: &()) -> garde::Result {
    match url::Url::parse(value) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => Ok(()),
        Ok(_) => Err(garde::Error::new("URL scheme must be http or https")),
        Err(_) => Err(garde::Error::new("not a valid URL")),
    }
}

/// Per-page rendering options forwarded to the worker untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageOptions {
    pub include_html: bool,
    pub include_raw_html: bool,
    pub include_links: bool,
    pub screenshot: bool,
    pub full_page_screenshot: bool,
    /// Milliseconds the worker should wait for dynamic content.
    pub wait_for: u64,
    pub headers: Option<HashMap<String, String>>,
}

/// Envelope returned to the caller for every scrape, success or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ScrapeData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScrapeResponse {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            warning: None,
            error: Some(message.into()),
        }
    }
}

/// Public payload for a completed scrape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_page_screenshot: Option<String>,
    pub metadata: ResponseMetadata,
}

/// Caller-facing metadata. `error` and `status_code` carry the values the
/// worker reported as `page_error` / `page_status_code`; the internal names
/// do not exist on this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub error: Option<String>,
    pub status_code: Option<u16>,
}

impl ScrapeData {
    /// Total mapping from the worker artifact to the public payload.
    ///
    /// Exhaustive destructuring keeps this honest: adding a field to
    /// `Document` forces a decision here about whether it is public.
    pub fn from_document(doc: Document) -> Self {
        let Document {
            markdown,
            html,
            raw_html,
            links_on_page,
            screenshot,
            full_page_screenshot,
            metadata,
            index: _,
            provider: _,
        } = doc;

        let DocumentMetadata {
            title,
            description,
            language,
            source_url,
            page_status_code,
            page_error,
        } = metadata;

        Self {
            markdown,
            html,
            raw_html,
            links: if links_on_page.is_empty() {
                None
            } else {
                Some(links_on_page)
            },
            screenshot,
            full_page_screenshot,
            metadata: ResponseMetadata {
                title,
                description,
                language,
                source_url,
                error: page_error,
                status_code: page_status_code,
            },
        }
    }
}
