//! facesync-core — attendance reconciliation between face sightings and an
//! HR system.
//!
//! Sightings are written through a local per-day cache and mirrored to the
//! remote system as paired IN/OUT check-ins; a grace sweep closes out
//! employees whose shift has ended.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod matcher;
pub mod push;
pub mod recognizer;
pub mod reconcile;
pub mod scheduler;
pub mod throttle;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{AttendanceApi, AttendanceSubmission, RemoteError, ShiftLookupError};
pub use cache::{AttendanceCache, AttendanceRecord, CacheError};
pub use clock::{Clock, SystemClock};
pub use config::{Config, ConfigError};
pub use reconcile::Reconciler;
pub use scheduler::GraceScheduler;
pub use types::{BoundingBox, CheckinId, EmployeeCode, Embedding, FaceObservation, LogType, ShiftInfo};
