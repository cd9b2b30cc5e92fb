//! Gallery-backed recognizer.
//!
//! The gallery is a directory of labeled reference embeddings, one JSON file
//! per employee named `<EMPLOYEE_CODE>.json`. It is read once at startup.

use crate::matcher::{GalleryEntry, Matcher};
use crate::types::{BoundingBox, EmployeeCode, Embedding, FaceObservation};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("cannot read gallery directory {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// One face in a frame after identification.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// `None` when the face matched nobody in the gallery.
    pub employee: Option<EmployeeCode>,
    pub bbox: BoundingBox,
    pub score: f32,
}

/// Turns the faces of one frame into identities.
pub trait Recognizer {
    fn recognize<'a>(
        &'a self,
        faces: &'a [FaceObservation],
    ) -> impl Iterator<Item = Detection> + 'a;
}

/// Matches each observed face against a fixed gallery.
pub struct GalleryRecognizer {
    gallery: Vec<GalleryEntry>,
    matcher: Box<dyn Matcher>,
}

impl GalleryRecognizer {
    pub fn new(gallery: Vec<GalleryEntry>, matcher: Box<dyn Matcher>) -> Self {
        Self { gallery, matcher }
    }

    pub fn len(&self) -> usize {
        self.gallery.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gallery.is_empty()
    }
}

impl Recognizer for GalleryRecognizer {
    fn recognize<'a>(
        &'a self,
        faces: &'a [FaceObservation],
    ) -> impl Iterator<Item = Detection> + 'a {
        faces.iter().map(move |face| {
            let result = self.matcher.compare(&face.embedding, &self.gallery);
            Detection {
                employee: result.employee,
                bbox: face.bbox.clone(),
                score: result.score,
            }
        })
    }
}

/// Load every `*.json` embedding in `dir`, labeled by file stem.
///
/// A missing directory is created and yields an empty gallery. Unreadable or
/// malformed files are logged and skipped.
pub fn load_gallery(dir: &Path) -> Result<Vec<GalleryEntry>, GalleryError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|source| GalleryError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        tracing::info!(dir = %dir.display(), "created empty gallery directory");
        return Ok(Vec::new());
    }

    let read_dir = std::fs::read_dir(dir).map_err(|source| GalleryError::Io {
        path: dir.display().to_string(),
        source,
    })?;

    let mut paths: Vec<_> = read_dir
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut gallery = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(code) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let parsed = std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|raw| serde_json::from_str::<Embedding>(&raw).map_err(|e| e.to_string()));
        match parsed {
            Ok(embedding) if !embedding.values.is_empty() => {
                tracing::debug!(employee = code, dims = embedding.values.len(), "loaded face");
                gallery.push(GalleryEntry {
                    employee: EmployeeCode::new(code),
                    embedding,
                });
            }
            Ok(_) => tracing::warn!(file = %path.display(), "empty embedding, skipped"),
            Err(reason) => {
                tracing::error!(file = %path.display(), %reason, "failed to load reference face")
            }
        }
    }

    tracing::info!(count = gallery.len(), "loaded known faces");
    Ok(gallery)
}
