//! HLS playlist parsing for the headless engine.
//!
//! Only what playback classification needs: master playlist variants,
//! media playlist segments, the end-list marker and the target duration.

use std::collections::HashMap;

/// A variant stream from a master playlist.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub bandwidth: u64,
    pub height: u32,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub sequence: u64,
    pub duration: f64,
    pub uri: String,
}

/// A parsed media playlist.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaPlaylist {
    pub segments: Vec<Segment>,
    /// No `#EXT-X-ENDLIST`: the playlist keeps growing.
    pub is_live: bool,
    pub target_duration: f64,
    pub media_sequence: u64,
}

impl MediaPlaylist {
    /// Sum of segment durations.
    #[must_use]
    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }

    /// Duration as reported to the session: `None` while live.
    #[must_use]
    pub fn reported_duration(&self) -> Option<f64> {
        (!self.is_live).then(|| self.total_duration())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Playlist {
    /// Variants sorted by bandwidth, best first.
    Master(Vec<Variant>),
    Media(MediaPlaylist),
}

impl Playlist {
    /// Parse playlist text fetched from `url` (used to resolve relative URIs).
    pub fn parse(content: &str, url: &str) -> Result<Self, String> {
        if !content.trim_start().starts_with("#EXTM3U") {
            return Err("missing #EXTM3U header".to_string());
        }
        let base_url = url.rsplit_once('/').map_or("", |(base, _)| base);
        if content.contains("#EXT-X-STREAM-INF:") {
            Ok(Self::Master(parse_master(content, base_url)))
        } else {
            Ok(Self::Media(parse_media(content, base_url)))
        }
    }
}

fn parse_master(content: &str, base_url: &str) -> Vec<Variant> {
    let mut variants = Vec::new();
    let mut lines = content.lines();

    while let Some(line) = lines.next() {
        let Some(rest) = line.strip_prefix("#EXT-X-STREAM-INF:") else {
            continue;
        };
        let attrs = parse_attributes(rest);
        let bandwidth = attrs
            .get("BANDWIDTH")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let height = attrs
            .get("RESOLUTION")
            .and_then(|r| r.split('x').nth(1))
            .and_then(|h| h.parse().ok())
            .unwrap_or(0);

        if let Some(uri_line) = lines.next() {
            if !uri_line.starts_with('#') {
                variants.push(Variant {
                    bandwidth,
                    height,
                    uri: resolve_url(base_url, uri_line.trim()),
                });
            }
        }
    }

    variants.sort_by(|a, b| b.bandwidth.cmp(&a.bandwidth));
    variants
}

fn parse_media(content: &str, base_url: &str) -> MediaPlaylist {
    let mut segments = Vec::new();
    let mut is_live = true;
    let mut media_sequence = 0u64;
    let mut target_duration = 10.0f64;
    let mut current_duration = None;

    for line in content.lines().map(str::trim) {
        if line.starts_with("#EXT-X-ENDLIST") {
            is_live = false;
        } else if let Some(rest) = line.strip_prefix("#EXT-X-MEDIA-SEQUENCE:") {
            media_sequence = rest.parse().unwrap_or(0);
        } else if let Some(rest) = line.strip_prefix("#EXT-X-TARGETDURATION:") {
            target_duration = rest.parse().unwrap_or(10.0);
        } else if let Some(rest) = line.strip_prefix("#EXTINF:") {
            current_duration = rest.split(',').next().and_then(|d| d.parse().ok());
        } else if !line.starts_with('#') && !line.is_empty() {
            segments.push(Segment {
                sequence: media_sequence + segments.len() as u64,
                duration: current_duration.take().unwrap_or(target_duration),
                uri: resolve_url(base_url, line),
            });
        }
    }

    MediaPlaylist {
        segments,
        is_live,
        target_duration,
        media_sequence,
    }
}

fn parse_attributes(attr_str: &str) -> HashMap<String, String> {
    let mut attrs = HashMap::new();
    let mut chars = attr_str.chars().peekable();

    while chars.peek().is_some() {
        let key: String = chars.by_ref().take_while(|&c| c != '=').collect();
        if key.is_empty() {
            break;
        }

        let value = if chars.peek() == Some(&'"') {
            chars.next();
            let v: String = chars.by_ref().take_while(|&c| c != '"').collect();
            chars.next(); // trailing comma
            v
        } else {
            chars.by_ref().take_while(|&c| c != ',').collect()
        };

        attrs.insert(key.trim().to_string(), value.trim().to_string());
    }

    attrs
}

/// Resolve a playlist URI against the directory of the playlist.
#[must_use]
pub fn resolve_url(base: &str, relative: &str) -> String {
    if relative.starts_with("http://") || relative.starts_with("https://") {
        relative.to_string()
    } else if relative.starts_with('/') {
        match base.find("://") {
            Some(idx) => match base[idx + 3..].find('/') {
                Some(end) => format!("{}{relative}", &base[..idx + 3 + end]),
                None => format!("{base}{relative}"),
            },
            None => relative.to_string(),
        }
    } else {
        format!("{base}/{relative}")
    }
}
