//! JSON-lines frame source.

use crate::frame::Frame;
use std::fs::File;
use std::io::{BufRead, BufReader};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("cannot open feed {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("feed read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed frame on line {line}: {source}")]
    Malformed {
        line: u64,
        #[source]
        source: serde_json::Error,
    },
    #[error("face {face} on line {line} has an empty embedding")]
    EmptyEmbedding { line: u64, face: usize },
}

impl FeedError {
    /// A bad line can be skipped; anything else ends the feed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FeedError::Malformed { .. } | FeedError::EmptyEmbedding { .. })
    }
}

/// Produces frames until the feed is exhausted.
pub trait FrameSource {
    /// `Ok(None)` at end of feed.
    fn next_frame(&mut self) -> Result<Option<Frame>, FeedError>;
}

/// Reads one JSON [`Frame`] per line. Blank lines are ignored.
pub struct JsonLinesSource<R> {
    reader: R,
    line: u64,
    sequence: u64,
    buf: String,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            sequence: 0,
            buf: String::new(),
        }
    }
}

impl JsonLinesSource<Box<dyn BufRead>> {
    /// Open `path`, or stdin when `path` is `-`.
    pub fn open(path: &str) -> Result<Self, FeedError> {
        let reader: Box<dyn BufRead> = if path == "-" {
            Box::new(BufReader::new(std::io::stdin()))
        } else {
            let file = File::open(path).map_err(|source| FeedError::Open {
                path: path.to_string(),
                source,
            })?;
            Box::new(BufReader::new(file))
        };
        tracing::info!(feed = path, "frame feed opened");
        Ok(Self::new(reader))
    }
}

impl<R: BufRead> FrameSource for JsonLinesSource<R> {
    fn next_frame(&mut self) -> Result<Option<Frame>, FeedError> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;

            let text = self.buf.trim();
            if text.is_empty() {
                continue;
            }

            self.sequence += 1;
            let mut frame: Frame = serde_json::from_str(text).map_err(|source| FeedError::Malformed {
                line: self.line,
                source,
            })?;
            if let Some(face) = frame.faces.iter().position(|f| f.embedding.values.is_empty()) {
                return Err(FeedError::EmptyEmbedding { line: self.line, face });
            }
            if frame.sequence == 0 {
                frame.sequence = self.sequence;
            }
            return Ok(Some(frame));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const FACE: &str = r#"{"bbox":{"x":1,"y":2,"width":30,"height":40,"confidence":0.9},"embedding":{"values":[0.1,0.2]}}"#;

    #[test]
    fn test_reads_frames_and_skips_blank_lines() {
        let input = format!("{{\"faces\":[{FACE}]}}\n\n{{\"faces\":[]}}\n");
        let mut source = JsonLinesSource::new(Cursor::new(input));

        let first = source.next_frame().unwrap().unwrap();
        assert_eq!(first.sequence, 1);
        assert_eq!(first.faces.len(), 1);
        assert_eq!(first.faces[0].embedding.values, vec![0.1, 0.2]);

        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(second.sequence, 2);
        assert!(second.is_empty());

        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_upstream_sequence_is_kept() {
        let mut source = JsonLinesSource::new(Cursor::new("{\"sequence\":42}\n"));
        assert_eq!(source.next_frame().unwrap().unwrap().sequence, 42);
    }

    #[test]
    fn test_malformed_line_is_recoverable() {
        let mut source = JsonLinesSource::new(Cursor::new("{\"faces\":\n{\"faces\":[]}\n"));

        let err = source.next_frame().unwrap_err();
        assert!(err.is_recoverable());
        assert!(matches!(err, FeedError::Malformed { line: 1, .. }));

        assert!(source.next_frame().unwrap().is_some());
    }

    #[test]
    fn test_empty_embedding_rejects_line() {
        let empty = r#"{"bbox":{"x":0,"y":0,"width":1,"height":1},"embedding":{"values":[]}}"#;
        let input = format!("{{\"faces\":[{FACE},{empty}]}}\n{{\"faces\":[{FACE}]}}\n");
        let mut source = JsonLinesSource::new(Cursor::new(input));

        let err = source.next_frame().unwrap_err();
        assert!(err.is_recoverable());
        assert!(matches!(err, FeedError::EmptyEmbedding { line: 1, face: 1 }));

        let next = source.next_frame().unwrap().unwrap();
        assert_eq!(next.faces.len(), 1);
    }

    #[test]
    fn test_open_missing_file() {
        let err = JsonLinesSource::open("/nonexistent/facesync/feed.jsonl").err().unwrap();
        assert!(!err.is_recoverable());
    }
}
