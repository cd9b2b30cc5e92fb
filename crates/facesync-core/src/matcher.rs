//! Probe-vs-gallery comparison strategies.

use crate::types::{EmployeeCode, Embedding};

/// A labeled reference embedding for one employee.
#[derive(Debug, Clone)]
pub struct GalleryEntry {
    pub employee: EmployeeCode,
    pub embedding: Embedding,
}

/// Result of matching a probe embedding against a gallery.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub matched: bool,
    /// Score of the best candidate (distance or similarity, depending on the matcher).
    pub score: f32,
    /// Employee of the best candidate, set only when `matched`.
    pub employee: Option<EmployeeCode>,
}

impl MatchResult {
    fn hit(entry: &GalleryEntry, score: f32) -> Self {
        Self {
            matched: true,
            score,
            employee: Some(entry.employee.clone()),
        }
    }

    fn no_match(score: f32) -> Self {
        Self {
            matched: false,
            score,
            employee: None,
        }
    }
}

/// Strategy for comparing a probe embedding against a gallery of known faces.
pub trait Matcher {
    fn compare(&self, probe: &Embedding, gallery: &[GalleryEntry]) -> MatchResult;
}

/// Score every comparable gallery entry and keep the one `beats` prefers.
///
/// Entries whose dimension differs from the probe are never candidates, and
/// an empty probe has none. Every entry is visited; ties keep the earlier one.
fn best_candidate<'g>(
    probe: &Embedding,
    gallery: &'g [GalleryEntry],
    score: impl Fn(&Embedding) -> f32,
    beats: impl Fn(f32, f32) -> bool,
) -> Option<(&'g GalleryEntry, f32)> {
    gallery
        .iter()
        .filter(|entry| probe.comparable(&entry.embedding))
        .map(|entry| (entry, score(&entry.embedding)))
        .fold(None, |best, (entry, s)| match best {
            Some((_, current)) if !beats(s, current) => best,
            _ => Some((entry, s)),
        })
}

/// Nearest-neighbour by Euclidean distance, accepted when within `tolerance`.
///
/// 0.6 is the customary tolerance for 128-d dlib-style encodings.
#[derive(Debug, Clone, Copy)]
pub struct EuclideanMatcher {
    pub tolerance: f32,
}

impl Default for EuclideanMatcher {
    fn default() -> Self {
        Self { tolerance: 0.6 }
    }
}

impl Matcher for EuclideanMatcher {
    fn compare(&self, probe: &Embedding, gallery: &[GalleryEntry]) -> MatchResult {
        match best_candidate(probe, gallery, |e| probe.euclidean_distance(e), |a, b| a < b) {
            Some((entry, dist)) if dist <= self.tolerance => MatchResult::hit(entry, dist),
            Some((_, dist)) => MatchResult::no_match(dist),
            None => MatchResult::no_match(f32::INFINITY),
        }
    }
}

/// Best cosine similarity, accepted when at or above `threshold`.
#[derive(Debug, Clone, Copy)]
pub struct CosineMatcher {
    pub threshold: f32,
}

impl Matcher for CosineMatcher {
    fn compare(&self, probe: &Embedding, gallery: &[GalleryEntry]) -> MatchResult {
        match best_candidate(probe, gallery, |e| probe.similarity(e), |a, b| a > b) {
            Some((entry, sim)) if sim >= self.threshold => MatchResult::hit(entry, sim),
            Some((_, sim)) => MatchResult::no_match(sim),
            None => MatchResult::no_match(0.0),
        }
    }
}
