//! Keyword search against the YouTube Data API, ranked by view count.
//!
//! Two sequential read-only calls: `search.list` for the hits, then one
//! batched `videos.list` for their statistics. Nothing is retried and a failed
//! statistics call throws the whole search away.

use std::collections::HashMap;

use log::{debug, info, warn};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::http;
use crate::models::{SearchResultSet, VideoSummary, dedupe_by_id};
use crate::security::ApiKey;

pub const MIN_LIMIT: u32 = 5;
pub const MAX_LIMIT: u32 = 25;
pub const DEFAULT_LIMIT: u32 = 10;

const SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";
const VIDEOS_URL: &str = "https://www.googleapis.com/youtube/v3/videos";
const SERVICE: &str = "YouTube Data API";

/// Parameters of the keyword search call. Result type and ordering are fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub keyword: String,
    pub max_results: u32,
}

/// One raw hit from the keyword search, in service order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub video_id: String,
    pub title: String,
    pub channel_title: String,
}

/// View count for one video id. Hidden counts come back as `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoStatistics {
    pub id: String,
    pub view_count: Option<u64>,
}

/// Boundary to the video-search service. [`YouTubeClient`] talks HTTP; tests
/// plug in doubles that count calls.
pub trait VideoSearchApi {
    fn search_videos(&self, query: &SearchQuery, key: &ApiKey) -> Result<Vec<SearchHit>>;
    fn video_statistics(&self, ids: &[String], key: &ApiKey) -> Result<Vec<VideoStatistics>>;
}

/// Searches `keyword`, keeps at most `limit` hits and ranks them by views.
pub fn search(
    api: &impl VideoSearchApi,
    keyword: &str,
    limit: u32,
    key: &ApiKey,
) -> Result<SearchResultSet> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Err(Error::invalid_input("a search keyword is required"));
    }
    if !(MIN_LIMIT..=MAX_LIMIT).contains(&limit) {
        return Err(Error::invalid_input(format!(
            "result limit must be between {MIN_LIMIT} and {MAX_LIMIT}, got {limit}"
        )));
    }

    let query = SearchQuery {
        keyword: keyword.to_string(),
        max_results: limit,
    };
    info!("searching videos for {keyword:?} (limit {limit})");
    let mut hits = api.search_videos(&query, key)?;
    hits.truncate(limit as usize);

    dedupe_by_id(&mut hits, |hit| hit.video_id.as_str());
    if hits.is_empty() {
        debug!("search returned no hits; skipping statistics lookup");
        return Ok(SearchResultSet::default());
    }

    let ids: Vec<String> = hits.iter().map(|hit| hit.video_id.clone()).collect();
    let stats = api.video_statistics(&ids, key)?;
    let views: HashMap<String, u64> = stats
        .into_iter()
        .map(|stat| (stat.id, stat.view_count.unwrap_or(0)))
        .collect();

    let summaries = hits.into_iter().filter_map(|hit| match views.get(&hit.video_id) {
        Some(&count) => Some(VideoSummary::new(
            hit.video_id,
            hit.title,
            hit.channel_title,
            count,
        )),
        None => {
            warn!(
                "no statistics returned for video {}; dropping it",
                hit.video_id
            );
            None
        }
    });

    let ranked = SearchResultSet::rank(summaries);
    info!("ranked {} video(s) by view count", ranked.len());
    Ok(ranked)
}

/// `ureq`-backed client for the public YouTube Data API v3.
pub struct YouTubeClient {
    agent: ureq::Agent,
    search_url: String,
    videos_url: String,
}

impl Default for YouTubeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl YouTubeClient {
    pub fn new() -> Self {
        Self::with_endpoints(SEARCH_URL, VIDEOS_URL)
    }

    pub fn with_endpoints(search_url: impl Into<String>, videos_url: impl Into<String>) -> Self {
        Self {
            agent: http::build_agent(),
            search_url: search_url.into(),
            videos_url: videos_url.into(),
        }
    }
}

#[derive(Deserialize)]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    #[serde(default)]
    video_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    channel_title: String,
}

#[derive(Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Deserialize)]
struct VideoItem {
    id: String,
    #[serde(default)]
    statistics: Option<Statistics>,
}

/// The API serializes counts as decimal strings.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    #[serde(default)]
    view_count: Option<String>,
}

fn parse_count(id: &str, raw: Option<String>) -> Result<Option<u64>> {
    match raw {
        None => Ok(None),
        Some(value) => value.parse::<u64>().map(Some).map_err(|_| {
            Error::upstream(format!("{SERVICE} returned view count {value:?} for {id}"))
        }),
    }
}

impl VideoSearchApi for YouTubeClient {
    fn search_videos(&self, query: &SearchQuery, key: &ApiKey) -> Result<Vec<SearchHit>> {
        debug!("GET {} q={:?}", self.search_url, query.keyword);
        let response = self
            .agent
            .get(&self.search_url)
            .query("part", "snippet")
            .query("type", "video")
            .query("order", "viewCount")
            .query("q", &query.keyword)
            .query("maxResults", &query.max_results.to_string())
            .query("key", key.expose())
            .call()
            .map_err(|err| http::from_ureq(SERVICE, err))?;
        let body: SearchListResponse = http::read_json(SERVICE, response)?;

        // `type=video` should make every id a video id; anything else is skipped.
        Ok(body
            .items
            .into_iter()
            .filter_map(|item| {
                item.id.video_id.map(|video_id| SearchHit {
                    video_id,
                    title: item.snippet.title,
                    channel_title: item.snippet.channel_title,
                })
            })
            .collect())
    }

    fn video_statistics(&self, ids: &[String], key: &ApiKey) -> Result<Vec<VideoStatistics>> {
        debug!("GET {} for {} id(s)", self.videos_url, ids.len());
        let response = self
            .agent
            .get(&self.videos_url)
            .query("part", "statistics")
            .query("id", &ids.join(","))
            .query("key", key.expose())
            .call()
            .map_err(|err| http::from_ureq(SERVICE, err))?;
        let body: VideoListResponse = http::read_json(SERVICE, response)?;

        body.items
            .into_iter()
            .map(|item| {
                let raw = item.statistics.and_then(|s| s.view_count);
                let view_count = parse_count(&item.id, raw)?;
                Ok(VideoStatistics {
                    id: item.id,
                    view_count,
                })
            })
            .collect()
    }
}
