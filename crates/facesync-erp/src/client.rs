//! Blocking ERPNext REST client.

use crate::wire::{
    CheckinTime, DocResponse, EmployeeDoc, NamedDoc, NewAttendance, NewCheckin, ShiftTypeDoc,
    DATETIME_FORMAT,
};
use chrono::{NaiveDateTime, NaiveTime};
use facesync_core::config::{Config, ServiceAccount};
use facesync_core::{
    AttendanceApi, AttendanceSubmission, CheckinId, EmployeeCode, LogType, RemoteError,
    ShiftInfo, ShiftLookupError,
};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

const CHECKIN_DOCTYPE: &str = "Employee Checkin";
const EMPLOYEE_DOCTYPE: &str = "Employee";
const SHIFT_TYPE_DOCTYPE: &str = "Shift Type";
const ATTENDANCE_DOCTYPE: &str = "Attendance";

/// Longest error body kept for logs.
const MAX_ERROR_BODY: usize = 512;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("invalid ERP base URL {0}")]
    InvalidBaseUrl(String),
    #[error("credentials cannot be sent as a header")]
    InvalidCredentials,
    #[error("http client: {0}")]
    Build(#[from] reqwest::Error),
}

/// ERPNext client authenticated with an API key/secret pair.
pub struct ErpClient {
    http: Client,
    base: Url,
    device_id: Option<String>,
}

impl ErpClient {
    pub fn new(base_url: &str, account: &ServiceAccount, timeout: Duration) -> Result<Self, ClientError> {
        let base = Url::parse(base_url).map_err(|_| ClientError::InvalidBaseUrl(base_url.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(base_url.to_string()));
        }

        let mut auth =
            HeaderValue::from_str(&account.auth_header()).map_err(|_| ClientError::InvalidCredentials)?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base,
            device_id: None,
        })
    }

    /// Build a client from the validated daemon configuration, tagging
    /// created check-ins with the camera id.
    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        Ok(Self::new(&config.erp_url, &config.service_account, config.request_timeout)?
            .with_device_id(config.camera_id.to_string()))
    }

    /// Stamp created check-ins with `device_id`.
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// `{base}/api/resource/{doctype}[/{name}]`, with each segment escaped.
    fn resource_url(&self, doctype: &str, name: Option<&str>) -> Result<Url, RemoteError> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| RemoteError::InvalidUrl(self.base.to_string()))?;
            segments.pop_if_empty().extend(["api", "resource", doctype]);
            if let Some(name) = name {
                segments.push(name);
            }
        }
        Ok(url)
    }

    fn get_doc<T: DeserializeOwned>(&self, doctype: &str, name: &str) -> Result<T, RemoteError> {
        let url = self.resource_url(doctype, Some(name))?;
        let resp = send(self.http.get(url))?;
        decode::<T>(resp)
    }
}

impl AttendanceApi for ErpClient {
    fn create_checkin(
        &self,
        employee: &EmployeeCode,
        at: NaiveDateTime,
        log_type: LogType,
    ) -> Result<CheckinId, RemoteError> {
        let url = self.resource_url(CHECKIN_DOCTYPE, None)?;
        let body = NewCheckin {
            employee: employee.as_str(),
            log_type: log_type.as_str(),
            time: at.format(DATETIME_FORMAT).to_string(),
            device_id: self.device_id.as_deref(),
        };
        tracing::debug!(employee = %employee, %log_type, time = %body.time, "creating checkin");

        let resp = send(self.http.post(url).json(&body))?;
        let doc: NamedDoc = decode(resp)?;
        Ok(CheckinId::new(doc.name))
    }

    fn update_checkin(&self, id: &CheckinId, at: NaiveDateTime) -> Result<CheckinId, RemoteError> {
        let url = self.resource_url(CHECKIN_DOCTYPE, Some(id.as_str()))?;
        let body = CheckinTime {
            time: at.format(DATETIME_FORMAT).to_string(),
        };
        tracing::debug!(checkin = %id, time = %body.time, "updating checkin");

        send(self.http.put(url).json(&body))?;
        Ok(id.clone())
    }

    fn fetch_shift(&self, employee: &EmployeeCode) -> Result<ShiftInfo, ShiftLookupError> {
        let emp: EmployeeDoc = self.get_doc(EMPLOYEE_DOCTYPE, employee.as_str())?;
        let shift = emp
            .shift_name()
            .ok_or(ShiftLookupError::NoShiftAssigned)?
            .to_string();

        let doc: ShiftTypeDoc = self.get_doc(SHIFT_TYPE_DOCTYPE, &shift)?;
        let (Some(start), Some(end)) = (doc.start_time.as_deref(), doc.end_time.as_deref()) else {
            return Err(ShiftLookupError::MissingShiftTimes { shift });
        };
        Ok(ShiftInfo {
            start: parse_shift_time(start)?,
            end: parse_shift_time(end)?,
        })
    }

    fn submit_attendance(&self, submission: &AttendanceSubmission) -> Result<(), RemoteError> {
        let url = self.resource_url(ATTENDANCE_DOCTYPE, None)?;
        let body = NewAttendance {
            employee: submission.employee.as_str(),
            attendance_date: submission.date.format("%Y-%m-%d").to_string(),
            in_time: submission.in_time.format("%H:%M:%S").to_string(),
            out_time: submission.out_time.format("%H:%M:%S").to_string(),
            status: "Present",
        };
        send(self.http.post(url).json(&body))?;
        Ok(())
    }
}

/// Send and classify the outcome: transport failures, 404, other non-2xx.
fn send(req: RequestBuilder) -> Result<Response, RemoteError> {
    let resp = req.send().map_err(transport_error)?;
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let url = resp.url().to_string();
    let mut body = resp.text().unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let cut = (0..=MAX_ERROR_BODY).rev().find(|&i| body.is_char_boundary(i)).unwrap_or(0);
        body.truncate(cut);
    }
    tracing::debug!(%url, status = status.as_u16(), %body, "ERP request rejected");

    if status == StatusCode::NOT_FOUND {
        Err(RemoteError::NotFound)
    } else {
        Err(RemoteError::Http {
            status: status.as_u16(),
            body,
        })
    }
}

fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, RemoteError> {
    resp.json::<DocResponse<T>>()
        .map(|doc| doc.data)
        .map_err(|e| RemoteError::Decode(e.to_string()))
}

fn transport_error(err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::Timeout
    } else {
        RemoteError::Connection(err.to_string())
    }
}

/// ERPNext renders Time fields as `H:MM:SS` or `HH:MM:SS[.ffffff]`.
fn parse_shift_time(raw: &str) -> Result<NaiveTime, RemoteError> {
    let raw = raw.trim();
    let padded = if raw.find(':') == Some(1) {
        format!("0{raw}")
    } else {
        raw.to_string()
    };
    NaiveTime::parse_from_str(&padded, "%H:%M:%S%.f")
        .map_err(|e| RemoteError::Decode(format!("shift time {raw:?}: {e}")))
}
