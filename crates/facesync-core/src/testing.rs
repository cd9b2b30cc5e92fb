//! Scriptable in-memory `AttendanceApi` for unit tests.

use crate::api::{AttendanceApi, AttendanceSubmission, RemoteError, ShiftLookupError};
use crate::types::{CheckinId, EmployeeCode, LogType, ShiftInfo};
use chrono::NaiveDateTime;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create {
        employee: EmployeeCode,
        at: NaiveDateTime,
        log_type: LogType,
    },
    Update {
        id: CheckinId,
        at: NaiveDateTime,
    },
    FetchShift(EmployeeCode),
    Submit(AttendanceSubmission),
}

/// Records every call. Creates succeed with sequential ids unless
/// `fail_creates` is set; updates of ids in `gone` report not-found.
#[derive(Default)]
pub struct FakeApi {
    pub calls: RefCell<Vec<Call>>,
    pub fail_creates: Cell<bool>,
    pub fail_updates: Cell<bool>,
    pub gone: RefCell<HashSet<String>>,
    pub shifts: RefCell<HashMap<String, ShiftInfo>>,
    pub reject_submissions: RefCell<HashSet<String>>,
    next_id: Cell<u32>,
}

impl FakeApi {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn creates(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, Call::Create { .. }))
            .count()
    }
}

impl AttendanceApi for FakeApi {
    fn create_checkin(
        &self,
        employee: &EmployeeCode,
        at: NaiveDateTime,
        log_type: LogType,
    ) -> Result<CheckinId, RemoteError> {
        self.calls.borrow_mut().push(Call::Create {
            employee: employee.clone(),
            at,
            log_type,
        });
        if self.fail_creates.get() {
            return Err(RemoteError::Timeout);
        }
        let n = self.next_id.get() + 1;
        self.next_id.set(n);
        Ok(CheckinId::new(format!("CKIN-{n:04}")))
    }

    fn update_checkin(&self, id: &CheckinId, at: NaiveDateTime) -> Result<CheckinId, RemoteError> {
        self.calls.borrow_mut().push(Call::Update { id: id.clone(), at });
        if self.gone.borrow().contains(id.as_str()) {
            return Err(RemoteError::NotFound);
        }
        if self.fail_updates.get() {
            return Err(RemoteError::Http {
                status: 500,
                body: "Internal Server Error".into(),
            });
        }
        Ok(id.clone())
    }

    fn fetch_shift(&self, employee: &EmployeeCode) -> Result<ShiftInfo, ShiftLookupError> {
        self.calls.borrow_mut().push(Call::FetchShift(employee.clone()));
        self.shifts
            .borrow()
            .get(employee.as_str())
            .copied()
            .ok_or(ShiftLookupError::NoShiftAssigned)
    }

    fn submit_attendance(&self, submission: &AttendanceSubmission) -> Result<(), RemoteError> {
        self.calls.borrow_mut().push(Call::Submit(submission.clone()));
        if self.reject_submissions.borrow().contains(submission.employee.as_str()) {
            return Err(RemoteError::Connection("connection refused".into()));
        }
        Ok(())
    }
}
