//! Attendance reconciliation.
//!
//! Every detection is written to the local cache first and then mirrored to
//! the HR system as a paired IN/OUT check-in. Remote failures are logged and
//! never roll back local state; a stale OUT id is replaced on the next sync.

use crate::api::AttendanceApi;
use crate::cache::{truncate_to_second, AttendanceCache, AttendanceRecord, CacheError};
use crate::types::{CheckinId, EmployeeCode, LogType, ShiftInfo};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;

/// Result of writing an OUT timestamp to the remote system.
#[derive(Debug, Clone, PartialEq)]
enum OutSync {
    /// The remote OUT record carries the timestamp.
    Synced(CheckinId),
    /// Write failed; whatever id we had is still valid.
    Failed,
    /// The stored id was stale and recreation failed too.
    Lost,
}

/// Single-writer attendance session: cache plus the per-process maps.
pub struct Reconciler<A> {
    api: A,
    cache: AttendanceCache,
    shifts: HashMap<EmployeeCode, ShiftInfo>,
    /// Checked-in employees and the day their record was opened.
    presence: HashMap<EmployeeCode, NaiveDate>,
    last_log_type: HashMap<EmployeeCode, LogType>,
    day: Option<NaiveDate>,
}

impl<A: AttendanceApi> Reconciler<A> {
    pub fn new(api: A, cache: AttendanceCache) -> Self {
        Self {
            api,
            cache,
            shifts: HashMap::new(),
            presence: HashMap::new(),
            last_log_type: HashMap::new(),
            day: None,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn cache(&self) -> &AttendanceCache {
        &self.cache
    }

    pub fn shift(&self, employee: &str) -> Option<&ShiftInfo> {
        self.shifts.get(employee)
    }

    pub fn set_shift(&mut self, employee: EmployeeCode, shift: ShiftInfo) {
        self.shifts.insert(employee, shift);
    }

    pub fn is_present(&self, employee: &str) -> bool {
        self.presence.contains_key(employee)
    }

    /// Employees currently checked in with the day their record was opened,
    /// in stable order.
    pub fn present(&self) -> Vec<(EmployeeCode, NaiveDate)> {
        let mut present: Vec<_> = self.presence.iter().map(|(e, d)| (e.clone(), *d)).collect();
        present.sort();
        present
    }

    pub fn last_log_type(&self, employee: &str) -> Option<LogType> {
        self.last_log_type.get(employee).copied()
    }

    /// Reset the day-scoped maps when the calendar day changes.
    ///
    /// Employees opened on the previous day with a known shift stay present
    /// so a grace window running past midnight can still close them. Anyone
    /// else left open is dropped. Shift info survives; it belongs to the
    /// process, not the day.
    pub fn begin_day(&mut self, today: NaiveDate) {
        match self.day {
            Some(day) if day == today => {}
            Some(day) => {
                let before = self.presence.len();
                let shifts = &self.shifts;
                self.presence
                    .retain(|employee, opened| *opened == day && shifts.contains_key(employee.as_str()));
                if before > 0 {
                    tracing::info!(
                        previous = %day,
                        carried = self.presence.len(),
                        dropped = before - self.presence.len(),
                        "day rolled over"
                    );
                }
                self.last_log_type.clear();
                self.day = Some(today);
            }
            None => self.day = Some(today),
        }
    }

    /// Record a sighting of `employee` at `now`.
    ///
    /// The first sighting of the day opens a record and creates both IN and
    /// OUT check-ins at the same timestamp. Later sightings move the OUT
    /// check-in forward. Only cache persistence failures are returned.
    pub fn record_detection(
        &mut self,
        employee: &EmployeeCode,
        now: NaiveDateTime,
    ) -> Result<(), CacheError> {
        let now = now.date().and_time(truncate_to_second(now.time()));
        let today = now.date();
        self.begin_day(today);

        if self.cache.get(today, employee.as_str()).is_none() {
            self.cache
                .insert(today, employee.clone(), AttendanceRecord::opened_at(now.time()));
            self.cache.save()?;

            let in_id = self.create(employee, now, LogType::In);
            let out_id = self.create(employee, now, LogType::Out);
            if let Some(record) = self.cache.get_mut(today, employee.as_str()) {
                record.in_id = in_id;
                record.out_id = out_id;
            }
            tracing::info!(employee = %employee, at = %now.time(), "checked in");
        } else {
            let (out_at, out_id) = match self.cache.get_mut(today, employee.as_str()) {
                Some(record) => {
                    record.extend_to(now.time());
                    (today.and_time(record.out_time), record.out_id.clone())
                }
                None => return Ok(()),
            };
            let sync = self.sync_out(employee, out_id.as_ref(), out_at);
            self.apply_out_sync(today, employee, sync);
            tracing::debug!(employee = %employee, at = %out_at.time(), "out time refreshed");
        }
        self.cache.save()?;

        if self.last_log_type(employee.as_str()) != Some(LogType::Out) {
            self.presence.insert(employee.clone(), today);
            self.last_log_type.insert(employee.clone(), LogType::In);
        }
        Ok(())
    }

    /// Confirm the employee's recorded OUT time remotely and mark them closed.
    ///
    /// Returns `Ok(true)` once the remote OUT record is confirmed (or there is
    /// no record to confirm), `Ok(false)` if the remote write failed and the
    /// employee stays present for a later attempt.
    pub fn close_out(&mut self, employee: &EmployeeCode, date: NaiveDate) -> Result<bool, CacheError> {
        let Some(record) = self.cache.get(date, employee.as_str()) else {
            tracing::warn!(employee = %employee, %date, "no attendance record to close; marking OUT locally");
            self.mark_closed(employee, date);
            return Ok(true);
        };
        let out_at = date.and_time(record.out_time);
        let out_id = record.out_id.clone();

        let sync = self.sync_out(employee, out_id.as_ref(), out_at);
        let confirmed = matches!(sync, OutSync::Synced(_));
        if self.apply_out_sync(date, employee, sync) {
            self.cache.save()?;
        }

        if confirmed {
            self.mark_closed(employee, date);
            tracing::info!(employee = %employee, at = %out_at.time(), "checked out");
        }
        Ok(confirmed)
    }

    /// Fetch and cache the employee's shift if it is not known yet.
    pub fn resolve_shift(&mut self, employee: &EmployeeCode) -> Option<ShiftInfo> {
        if let Some(shift) = self.shifts.get(employee.as_str()) {
            return Some(*shift);
        }
        match self.api.fetch_shift(employee) {
            Ok(shift) => {
                tracing::info!(employee = %employee, start = %shift.start, end = %shift.end, "shift resolved");
                self.shifts.insert(employee.clone(), shift);
                Some(shift)
            }
            Err(e) => {
                tracing::warn!(employee = %employee, operation = "fetch_shift", reason = %e, "shift lookup failed");
                None
            }
        }
    }

    /// Closing a carried-over record leaves today's log type alone.
    fn mark_closed(&mut self, employee: &EmployeeCode, date: NaiveDate) {
        if self.presence.get(employee.as_str()) == Some(&date) {
            self.presence.remove(employee.as_str());
        }
        if self.day == Some(date) {
            self.last_log_type.insert(employee.clone(), LogType::Out);
        }
    }

    fn create(&self, employee: &EmployeeCode, at: NaiveDateTime, log_type: LogType) -> Option<CheckinId> {
        match self.api.create_checkin(employee, at, log_type) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::error!(
                    employee = %employee,
                    operation = "create_checkin",
                    log_type = %log_type,
                    reason = %e,
                    "remote checkin create failed"
                );
                None
            }
        }
    }

    /// Write `at` to the OUT check-in, creating it when there is no id or the
    /// id turned out to be stale.
    fn sync_out(&self, employee: &EmployeeCode, out_id: Option<&CheckinId>, at: NaiveDateTime) -> OutSync {
        let Some(id) = out_id else {
            return match self.create(employee, at, LogType::Out) {
                Some(id) => OutSync::Synced(id),
                None => OutSync::Failed,
            };
        };

        match self.api.update_checkin(id, at) {
            Ok(id) => OutSync::Synced(id),
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    employee = %employee,
                    operation = "update_checkin",
                    checkin = %id,
                    "OUT checkin no longer exists; creating a new one"
                );
                match self.create(employee, at, LogType::Out) {
                    Some(id) => OutSync::Synced(id),
                    None => OutSync::Lost,
                }
            }
            Err(e) => {
                tracing::error!(
                    employee = %employee,
                    operation = "update_checkin",
                    checkin = %id,
                    reason = %e,
                    "remote checkin update failed"
                );
                OutSync::Failed
            }
        }
    }

    /// Store the outcome of [`sync_out`](Self::sync_out). Returns whether the
    /// record changed.
    fn apply_out_sync(&mut self, date: NaiveDate, employee: &EmployeeCode, sync: OutSync) -> bool {
        let Some(record) = self.cache.get_mut(date, employee.as_str()) else {
            return false;
        };
        let next = match sync {
            OutSync::Synced(id) => Some(id),
            OutSync::Lost => None,
            OutSync::Failed => return false,
        };
        if record.out_id == next {
            return false;
        }
        record.out_id = next;
        true
    }
}
