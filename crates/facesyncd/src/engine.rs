//! The detection loop: frame → recognition → reconciliation → grace sweep.
//!
//! Runs on the calling thread. Remote calls block the loop for at most the
//! client timeout; nothing is cancelled mid-flight.

use facesync_core::recognizer::Recognizer;
use facesync_core::throttle::DetectionThrottle;
use facesync_core::{AttendanceApi, CacheError, Clock, EmployeeCode, GraceScheduler, Reconciler};
use facesync_feed::{FeedError, Frame, FrameSource};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("attendance cache: {0}")]
    Cache(#[from] CacheError),
    #[error("frame feed: {0}")]
    Feed(#[from] FeedError),
}

/// Counters reported when the loop stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoopStats {
    pub frames: u64,
    pub skipped_frames: u64,
    pub detections: u64,
    pub throttled: u64,
    pub unknown_faces: u64,
    pub closed_out: u64,
}

pub struct DetectionLoop<A, R, C> {
    reconciler: Reconciler<A>,
    recognizer: R,
    scheduler: GraceScheduler,
    throttle: DetectionThrottle,
    clock: C,
    stats: LoopStats,
}

impl<A: AttendanceApi, R: Recognizer, C: Clock> DetectionLoop<A, R, C> {
    pub fn new(
        reconciler: Reconciler<A>,
        recognizer: R,
        scheduler: GraceScheduler,
        throttle: DetectionThrottle,
        clock: C,
    ) -> Self {
        Self {
            reconciler,
            recognizer,
            scheduler,
            throttle,
            clock,
            stats: LoopStats::default(),
        }
    }

    pub fn reconciler(&self) -> &Reconciler<A> {
        &self.reconciler
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Pull frames until the feed ends or `stop` is raised.
    ///
    /// Malformed frames are skipped. Cache write failures and feed I/O
    /// failures end the loop.
    pub fn run<F: FrameSource>(&mut self, feed: &mut F, stop: &AtomicBool) -> Result<LoopStats, EngineError> {
        tracing::info!("detection loop started");
        while !stop.load(Ordering::SeqCst) {
            let frame = match feed.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    tracing::info!("frame feed ended");
                    break;
                }
                Err(e) if e.is_recoverable() => {
                    tracing::warn!(error = %e, "skipping frame");
                    self.stats.skipped_frames += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            self.step(&frame)?;
        }
        tracing::info!(stats = ?self.stats, "detection loop stopped");
        Ok(self.stats)
    }

    /// Process one frame and run the grace sweep.
    pub fn step(&mut self, frame: &Frame) -> Result<Vec<EmployeeCode>, EngineError> {
        let now = self.clock.now();
        self.stats.frames += 1;

        let mut seen: Vec<EmployeeCode> = Vec::new();
        for detection in self.recognizer.recognize(&frame.faces) {
            match detection.employee {
                Some(employee) if !seen.contains(&employee) => seen.push(employee),
                Some(_) => {}
                None => {
                    self.stats.unknown_faces += 1;
                    tracing::trace!(frame = frame.sequence, score = detection.score, "unknown face");
                }
            }
        }

        for employee in &seen {
            if !self.throttle.admit(employee, now) {
                self.stats.throttled += 1;
                continue;
            }
            tracing::debug!(frame = frame.sequence, employee = %employee, "employee detected");
            self.stats.detections += 1;
            self.reconciler.record_detection(employee, now)?;
            self.reconciler.resolve_shift(employee);
        }

        let closed = self.scheduler.sweep(&mut self.reconciler, now)?;
        self.stats.closed_out += closed.len() as u64;
        Ok(seen)
    }
}
