//! # Track Resolver
//!
//! Turns engine-native track listings into [`TrackDescriptor`]s with ids that
//! are unique within their group.
//!
//! Ids prefer the explicit language tag, then the locale identifier, then a
//! generated value. Generated ids change on every resolve, so they are only
//! meaningful until the next `load`. Duplicate ids inside one group get a
//! `#n` suffix (`en`, `en#2`).

use crate::types::{TrackDescriptor, TrackKind};
use std::collections::HashSet;
use uuid::Uuid;

/// Track as listed by an engine, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawTrack {
    /// Engine-side handle used to select the track again.
    pub native_index: i32,
    pub display_name: String,
    pub language_tag: Option<String>,
    pub locale: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTrack {
    pub descriptor: TrackDescriptor,
    pub native_index: i32,
    language_tag: Option<String>,
    locale: Option<String>,
}

/// Normalized tracks of one group for the current media item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackGroup {
    tracks: Vec<ResolvedTrack>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Primary language subtag, lowercased: `en-US` and `en_US` both give `en`.
pub fn language_code(tag_or_locale: &str) -> Option<String> {
    let primary = tag_or_locale
        .split(['-', '_'])
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())?;
    Some(primary.to_ascii_lowercase())
}

/// First track whose primary language equals that of `code`.
pub fn find_by_language<'a>(
    tracks: &'a [TrackDescriptor],
    code: &str,
) -> Option<&'a TrackDescriptor> {
    let code = language_code(code)?;
    tracks
        .iter()
        .find(|t| t.language_code.as_deref() == Some(code.as_str()))
}

impl TrackGroup {
    pub fn resolve(kind: TrackKind, raw: impl IntoIterator<Item = RawTrack>) -> Self {
        let mut seen: HashSet<String> = HashSet::new();
        let mut tracks = Vec::new();

        for track in raw {
            let tag = non_empty(&track.language_tag);
            let locale = non_empty(&track.locale);

            let base_id = tag
                .or(locale)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}-{}", kind, Uuid::new_v4().simple()));

            let mut id = base_id.clone();
            let mut n = 2;
            while !seen.insert(id.clone()) {
                id = format!("{}#{}", base_id, n);
                n += 1;
            }

            let display_name = if track.display_name.trim().is_empty() {
                tag.or(locale)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Track {}", tracks.len() + 1))
            } else {
                track.display_name.clone()
            };

            tracks.push(ResolvedTrack {
                descriptor: TrackDescriptor {
                    id,
                    display_name,
                    language_code: tag.or(locale).and_then(language_code),
                },
                native_index: track.native_index,
                language_tag: tag.map(str::to_string),
                locale: locale.map(str::to_string),
            });
        }

        Self { tracks }
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn descriptors(&self) -> Vec<TrackDescriptor> {
        self.tracks.iter().map(|t| t.descriptor.clone()).collect()
    }

    /// Find a track by id.
    ///
    /// Exact id matches win; otherwise the id is compared (case-insensitively)
    /// against the raw language tags, then the locale identifiers.
    pub fn find(&self, id: &str) -> Option<&ResolvedTrack> {
        self.tracks
            .iter()
            .find(|t| t.descriptor.id == id)
            .or_else(|| {
                self.tracks.iter().find(|t| {
                    t.language_tag
                        .as_deref()
                        .is_some_and(|tag| tag.eq_ignore_ascii_case(id))
                })
            })
            .or_else(|| {
                self.tracks.iter().find(|t| {
                    t.locale
                        .as_deref()
                        .is_some_and(|locale| locale.eq_ignore_ascii_case(id))
                })
            })
    }

    pub fn by_native_index(&self, native_index: i32) -> Option<&ResolvedTrack> {
        self.tracks.iter().find(|t| t.native_index == native_index)
    }
}
