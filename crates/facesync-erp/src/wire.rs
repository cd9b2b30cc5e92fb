//! ERPNext REST document shapes (`/api/resource/<DocType>`).

use serde::{Deserialize, Serialize};

/// Timestamp format ERPNext accepts for Datetime fields.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Every `/api/resource` response wraps the document in `data`.
#[derive(Debug, Deserialize)]
pub struct DocResponse<T> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct NewCheckin<'a> {
    pub employee: &'a str,
    pub log_type: &'a str,
    pub time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct CheckinTime {
    pub time: String,
}

#[derive(Debug, Deserialize)]
pub struct NamedDoc {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct EmployeeDoc {
    #[serde(default)]
    pub shift_type: Option<String>,
    #[serde(default)]
    pub default_shift: Option<String>,
}

impl EmployeeDoc {
    /// Assigned shift type, preferring `shift_type` over `default_shift`.
    pub fn shift_name(&self) -> Option<&str> {
        [&self.shift_type, &self.default_shift]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct ShiftTypeDoc {
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NewAttendance<'a> {
    pub employee: &'a str,
    pub attendance_date: String,
    pub in_time: String,
    pub out_time: String,
    pub status: &'static str,
}
