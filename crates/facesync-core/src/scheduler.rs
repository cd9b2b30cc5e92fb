//! Shift-end grace sweep.
//!
//! Employees still present `grace` after their shift ended are closed out.
//! The shift end is taken on the day the employee's record was opened, so a
//! window that runs past midnight still closes. Employees without known
//! shift info are never force-closed.

use crate::api::AttendanceApi;
use crate::cache::CacheError;
use crate::reconcile::Reconciler;
use crate::types::{EmployeeCode, LogType};
use chrono::{Duration, NaiveDateTime};

/// Grace period applied after shift end when none is configured.
pub const DEFAULT_GRACE_MINUTES: i64 = 120;

#[derive(Debug, Clone, Copy)]
pub struct GraceScheduler {
    grace: Duration,
}

impl Default for GraceScheduler {
    fn default() -> Self {
        Self {
            grace: Duration::minutes(DEFAULT_GRACE_MINUTES),
        }
    }
}

impl GraceScheduler {
    pub fn new(grace: Duration) -> Self {
        Self { grace }
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Close out every present employee whose grace window has expired.
    ///
    /// Returns the employees closed by this sweep. Employees whose remote OUT
    /// could not be confirmed stay present and are retried next sweep.
    pub fn sweep<A: AttendanceApi>(
        &self,
        reconciler: &mut Reconciler<A>,
        now: NaiveDateTime,
    ) -> Result<Vec<EmployeeCode>, CacheError> {
        let today = now.date();
        reconciler.begin_day(today);

        let mut closed = Vec::new();
        for (employee, opened) in reconciler.present() {
            let Some(shift) = reconciler.shift(employee.as_str()).copied() else {
                continue;
            };
            let grace_end = opened.and_time(shift.end) + self.grace;
            if now < grace_end {
                continue;
            }
            if reconciler.last_log_type(employee.as_str()) == Some(LogType::Out) {
                continue;
            }

            if reconciler.close_out(&employee, opened)? {
                tracing::info!(employee = %employee, %grace_end, "marked OUT after shift grace period");
                closed.push(employee);
            } else {
                tracing::warn!(employee = %employee, %grace_end, "grace expired but OUT not confirmed; will retry");
            }
        }
        Ok(closed)
    }
}
