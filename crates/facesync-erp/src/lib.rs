//! facesync-erp — ERPNext implementation of [`facesync_core::AttendanceApi`].
//!
//! Talks to the Frappe REST resource API (`/api/resource/<DocType>`) with
//! token authentication and a per-request timeout.

pub mod client;
pub mod wire;

pub use client::{ClientError, ErpClient};
