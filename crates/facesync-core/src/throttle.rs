use crate::types::EmployeeCode;
use chrono::{Duration, NaiveDateTime};
use std::collections::HashMap;

/// Admits at most one detection per employee per `interval`.
///
/// Sits in front of the reconciler so a face held in view does not turn
/// every frame into a remote update.
#[derive(Debug)]
pub struct DetectionThrottle {
    interval: Duration,
    last_accepted: HashMap<EmployeeCode, NaiveDateTime>,
}

impl DetectionThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_accepted: HashMap::new(),
        }
    }

    pub fn admit(&mut self, employee: &EmployeeCode, now: NaiveDateTime) -> bool {
        match self.last_accepted.get(employee.as_str()) {
            Some(last) if now >= *last && now - *last < self.interval => false,
            _ => {
                self.last_accepted.insert(employee.clone(), now);
                true
            }
        }
    }
}
