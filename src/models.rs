//! Data carried between the search, comment-loading and generation steps.
//!
//! Nothing here is persisted. Values are built for one operator session and
//! dropped when the calling front end is done with them.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::{Error, Result};

pub const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";
pub const MIN_WATCH_SECONDS: u64 = 5;
pub const SCRIPT_FILE_NAME: &str = "yt_auto_script.py";
pub const SCRIPT_MIME_TYPE: &str = "text/x-python";

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoSummary {
    pub id: String,
    pub title: String,
    pub channel_title: String,
    pub view_count: u64,
    pub url: String,
}

impl VideoSummary {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        channel_title: impl Into<String>,
        view_count: u64,
    ) -> Self {
        let id = id.into();
        let url = Self::watch_url(&id);
        Self {
            id,
            title: title.into(),
            channel_title: channel_title.into(),
            view_count,
            url,
        }
    }

    pub fn watch_url(id: &str) -> String {
        format!("{WATCH_URL_PREFIX}{id}")
    }
}

/// Keeps the first occurrence of every id, preserving order.
pub(crate) fn dedupe_by_id<T>(items: &mut Vec<T>, id: impl Fn(&T) -> &str) {
    let mut seen = HashSet::new();
    items.retain(|item| seen.insert(id(item).to_string()));
}

/// Search results ordered by view count, highest first.
///
/// Equal view counts keep the order the search service returned them in, and
/// every id appears at most once. The only way to build one is
/// [`SearchResultSet::rank`], so both properties always hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SearchResultSet(Vec<VideoSummary>);

impl SearchResultSet {
    pub fn rank(videos: impl IntoIterator<Item = VideoSummary>) -> Self {
        let mut ranked: Vec<VideoSummary> = videos.into_iter().collect();
        dedupe_by_id(&mut ranked, |video| video.id.as_str());
        // `sort_by` is stable, which is what keeps ties in service order.
        ranked.sort_by(|a, b| b.view_count.cmp(&a.view_count));
        Self(ranked)
    }

    pub fn videos(&self) -> &[VideoSummary] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Picks a video by its 1-based position in the listing.
    pub fn select(&self, position: usize) -> Result<&VideoSummary> {
        if position == 0 || position > self.0.len() {
            return Err(Error::invalid_input(format!(
                "pick must be between 1 and {}, got {position}",
                self.0.len()
            )));
        }
        Ok(&self.0[position - 1])
    }
}

/// Comment texts in source row order. Every entry is trimmed and non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CommentList(Vec<String>);

impl CommentList {
    /// Keeps the first cell of each row, skipping rows whose first cell is
    /// missing or blank.
    pub fn from_rows<R, C>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = C>,
        C: AsRef<str>,
    {
        let comments = rows
            .into_iter()
            .filter_map(|row| {
                let first = row.into_iter().next()?;
                let trimmed = first.as_ref().trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .collect();
        Self(comments)
    }

    /// One comment per line, same normalization as spreadsheet rows.
    pub fn from_text(text: &str) -> Self {
        Self::from_rows(text.lines().map(|line| [line]))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn preview(&self, count: usize) -> &[String] {
        &self.0[..self.0.len().min(count)]
    }
}

/// Everything the script generator needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptRequest {
    pub target_url: String,
    pub comments: CommentList,
    pub watch_seconds: u64,
    pub enable_like: bool,
    pub enable_comment: bool,
    pub enable_subscribe: bool,
}

impl ScriptRequest {
    /// Caller-side preconditions. The generator itself renders whatever it
    /// gets, so front ends run this before calling it.
    pub fn validate(&self) -> Result<()> {
        if self.target_url.trim().is_empty() {
            return Err(Error::invalid_input("a target video URL is required"));
        }
        if self.watch_seconds < MIN_WATCH_SECONDS {
            return Err(Error::invalid_input(format!(
                "watch seconds must be at least {MIN_WATCH_SECONDS}, got {}",
                self.watch_seconds
            )));
        }
        if self.enable_comment && self.comments.is_empty() {
            return Err(Error::invalid_input(
                "posting comments is enabled but no comments were loaded",
            ));
        }
        Ok(())
    }
}

/// Rendered automation script, ready to be saved or shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedScript {
    text: String,
}

impl GeneratedScript {
    pub(crate) fn new(text: String) -> Self {
        Self { text }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn file_name(&self) -> &'static str {
        SCRIPT_FILE_NAME
    }

    pub fn mime_type(&self) -> &'static str {
        SCRIPT_MIME_TYPE
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// Renders a count with thousands separators, e.g. `1,234,567`.
pub fn format_views(count: u64) -> String {
    let digits = count.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
