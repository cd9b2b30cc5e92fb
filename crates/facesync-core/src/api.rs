//! The remote HR system as seen by the reconciler.
//!
//! Implementations perform blocking calls with a bounded timeout and report
//! every outcome as a value; nothing here panics or retries on its own.

use crate::types::{CheckinId, EmployeeCode, LogType, ShiftInfo};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("cannot reach server: {0}")]
    Connection(String),
    #[error("request timed out")]
    Timeout,
    #[error("record not found")]
    NotFound,
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound)
    }
}

#[derive(Error, Debug)]
pub enum ShiftLookupError {
    #[error("no shift type assigned")]
    NoShiftAssigned,
    #[error("shift type {shift} has no start/end time")]
    MissingShiftTimes { shift: String },
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// A day's attendance summary forwarded to the HR system.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceSubmission {
    pub employee: EmployeeCode,
    pub date: NaiveDate,
    pub in_time: NaiveTime,
    pub out_time: NaiveTime,
}

/// Check-in, shift and attendance operations of the remote HR system.
pub trait AttendanceApi {
    /// Create an Employee Checkin and return its name.
    fn create_checkin(
        &self,
        employee: &EmployeeCode,
        at: NaiveDateTime,
        log_type: LogType,
    ) -> Result<CheckinId, RemoteError>;

    /// Move an existing Employee Checkin to `at`.
    ///
    /// Returns [`RemoteError::NotFound`] when the record is gone. Never
    /// creates a replacement.
    fn update_checkin(&self, id: &CheckinId, at: NaiveDateTime) -> Result<CheckinId, RemoteError>;

    /// Resolve the employee's shift type and its working hours.
    fn fetch_shift(&self, employee: &EmployeeCode) -> Result<ShiftInfo, ShiftLookupError>;

    /// Submit a day's attendance summary.
    fn submit_attendance(&self, submission: &AttendanceSubmission) -> Result<(), RemoteError>;
}

impl<T: AttendanceApi + ?Sized> AttendanceApi for &T {
    fn create_checkin(
        &self,
        employee: &EmployeeCode,
        at: NaiveDateTime,
        log_type: LogType,
    ) -> Result<CheckinId, RemoteError> {
        (**self).create_checkin(employee, at, log_type)
    }

    fn update_checkin(&self, id: &CheckinId, at: NaiveDateTime) -> Result<CheckinId, RemoteError> {
        (**self).update_checkin(id, at)
    }

    fn fetch_shift(&self, employee: &EmployeeCode) -> Result<ShiftInfo, ShiftLookupError> {
        (**self).fetch_shift(employee)
    }

    fn submit_attendance(&self, submission: &AttendanceSubmission) -> Result<(), RemoteError> {
        (**self).submit_attendance(submission)
    }
}
