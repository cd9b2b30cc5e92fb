//! Forward a day's cached attendance to the HR system and clear it.

use crate::api::{AttendanceApi, AttendanceSubmission};
use crate::cache::{AttendanceCache, CacheError};
use crate::types::EmployeeCode;
use chrono::NaiveDate;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DrainReport {
    pub forwarded: Vec<EmployeeCode>,
    pub failed: Vec<EmployeeCode>,
}

/// Submit every record of `date` and drop the ones that were accepted.
///
/// Rejected records stay in the cache so a rerun retries them. A missing or
/// empty day is not an error.
pub fn drain_day<A: AttendanceApi>(
    cache: &mut AttendanceCache,
    api: &A,
    date: NaiveDate,
) -> Result<DrainReport, CacheError> {
    let submissions: Vec<AttendanceSubmission> = match cache.day(date) {
        Some(day) => day
            .iter()
            .map(|(employee, record)| AttendanceSubmission {
                employee: employee.clone(),
                date,
                in_time: record.in_time,
                out_time: record.out_time,
            })
            .collect(),
        None => {
            tracing::info!(%date, "no cached attendance for date");
            return Ok(DrainReport::default());
        }
    };

    let mut report = DrainReport::default();
    for submission in &submissions {
        match api.submit_attendance(submission) {
            Ok(()) => {
                tracing::info!(
                    employee = %submission.employee,
                    in_time = %submission.in_time,
                    out_time = %submission.out_time,
                    "attendance pushed"
                );
                cache.remove(date, submission.employee.as_str());
                report.forwarded.push(submission.employee.clone());
            }
            Err(e) => {
                tracing::error!(
                    employee = %submission.employee,
                    operation = "submit_attendance",
                    reason = %e,
                    "attendance push failed"
                );
                report.failed.push(submission.employee.clone());
            }
        }
    }

    cache.save()?;
    Ok(report)
}
