//! Optional video metadata scraped from the watch page
//!
//! Failure is never fatal, but callers can tell "the page has no such data"
//! apart from "the page could not be fetched".

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tracing::debug;

use crate::captions::{FetchRequest, HttpFetch, PageScraper, Route};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VideoMetadata {
    pub title: String,
    pub thumbnail: String,
    pub duration_seconds: Option<u64>,
    pub view_count: Option<u64>,
    pub upload_date: Option<String>,
}

impl VideoMetadata {
    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetadataOutcome {
    Available(VideoMetadata),
    NotAvailable,
    TransientError(String),
}

impl MetadataOutcome {
    /// The metadata, or the empty object when none could be obtained
    pub fn unwrap_or_empty(self) -> VideoMetadata {
        match self {
            MetadataOutcome::Available(metadata) => metadata,
            MetadataOutcome::NotAvailable | MetadataOutcome::TransientError(_) => VideoMetadata::empty(),
        }
    }
}

#[async_trait]
pub trait MetadataService: Send + Sync {
    async fn info(&self, video_id: &str) -> MetadataOutcome;
}

/// Reads Open Graph and microdata tags from the watch page
pub struct PageMetadataService {
    fetcher: Arc<dyn HttpFetch>,
}

impl PageMetadataService {
    pub fn new(fetcher: Arc<dyn HttpFetch>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl MetadataService for PageMetadataService {
    async fn info(&self, video_id: &str) -> MetadataOutcome {
        let route = if self.fetcher.has_proxy() { Route::Proxied } else { Route::Direct };
        match self
            .fetcher
            .fetch(&FetchRequest::get(PageScraper::watch_url(video_id)), route)
            .await
        {
            Ok(page) => match parse_metadata(&page) {
                Some(metadata) => MetadataOutcome::Available(metadata),
                None => MetadataOutcome::NotAvailable,
            },
            Err(failure) if failure.is_retryable() => MetadataOutcome::TransientError(failure.to_string()),
            Err(failure) => {
                debug!("No metadata page for {}: {}", video_id, failure);
                MetadataOutcome::NotAvailable
            }
        }
    }
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .filter_map(|element| element.value().attr("content"))
        .map(str::trim)
        .find(|content| !content.is_empty())
        .map(str::to_string)
}

/// Extract metadata from a watch page; `None` when the page carries no title
pub fn parse_metadata(page: &str) -> Option<VideoMetadata> {
    let document = Html::parse_document(page);
    let title = meta_content(&document, r#"meta[property="og:title"]"#)
        .or_else(|| meta_content(&document, r#"meta[name="title"]"#))?;

    Some(VideoMetadata {
        title,
        thumbnail: meta_content(&document, r#"meta[property="og:image"]"#).unwrap_or_default(),
        duration_seconds: meta_content(&document, r#"meta[itemprop="duration"]"#).and_then(|d| parse_iso_duration(&d)),
        view_count: meta_content(&document, r#"meta[itemprop="interactionCount"]"#)
            .or_else(|| meta_content(&document, r#"meta[itemprop="userInteractionCount"]"#))
            .and_then(|v| v.replace(',', "").parse().ok()),
        upload_date: meta_content(&document, r#"meta[itemprop="uploadDate"]"#)
            .or_else(|| meta_content(&document, r#"meta[itemprop="datePublished"]"#)),
    })
}

fn iso_duration() -> &'static Regex {
    static DURATION: OnceLock<Regex> = OnceLock::new();
    DURATION.get_or_init(|| {
        Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$").expect("valid duration regex")
    })
}

/// `PT1H2M3S` / `PT12M5S` / `P0D` into seconds
pub fn parse_iso_duration(text: &str) -> Option<u64> {
    let captures = iso_duration().captures(text.trim())?;
    let part = |index: usize| {
        captures
            .get(index)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0)
    };
    Some(part(1) * 86_400 + part(2) * 3600 + part(3) * 60 + part(4))
}
