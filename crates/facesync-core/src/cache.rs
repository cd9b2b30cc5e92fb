//! Write-through attendance cache persisted as a single JSON document.
//!
//! Layout: `{ "YYYY-MM-DD": { "<employee>": { in_time, out_time, in_id, out_id } } }`.

use crate::types::{CheckinId, EmployeeCode};
use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache I/O on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cache encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One employee's attendance for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    #[serde(with = "hms")]
    pub in_time: NaiveTime,
    #[serde(with = "hms")]
    pub out_time: NaiveTime,
    #[serde(default)]
    pub in_id: Option<CheckinId>,
    #[serde(default)]
    pub out_id: Option<CheckinId>,
}

impl AttendanceRecord {
    /// A fresh record for a first sighting at `at`.
    pub fn opened_at(at: NaiveTime) -> Self {
        let at = truncate_to_second(at);
        Self {
            in_time: at,
            out_time: at,
            in_id: None,
            out_id: None,
        }
    }

    /// Move `out_time` forward to `at`. Earlier times are ignored.
    pub fn extend_to(&mut self, at: NaiveTime) {
        let at = truncate_to_second(at);
        if at > self.out_time {
            self.out_time = at;
        }
    }
}

/// date -> employee -> record
pub type AttendanceDays = BTreeMap<NaiveDate, BTreeMap<EmployeeCode, AttendanceRecord>>;

/// In-memory attendance state bound to its backing file.
#[derive(Debug)]
pub struct AttendanceCache {
    path: PathBuf,
    days: AttendanceDays,
}

impl AttendanceCache {
    /// Load the cache from `path`.
    ///
    /// A missing file yields an empty cache. So does a corrupt one, after a
    /// warning; the next save replaces it.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let days = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<AttendanceDays>(&bytes) {
                Ok(days) => days,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "attendance cache is corrupt; starting empty");
                    AttendanceDays::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => AttendanceDays::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "attendance cache unreadable; starting empty");
                AttendanceDays::new()
            }
        };
        tracing::debug!(path = %path.display(), days = days.len(), "attendance cache loaded");
        Self { path, days }
    }

    /// Create a cache with the given contents without touching disk.
    pub fn with_days(path: impl Into<PathBuf>, days: AttendanceDays) -> Self {
        Self {
            path: path.into(),
            days,
        }
    }

    /// Rewrite the whole cache file.
    ///
    /// Writes a sibling temp file, syncs it and renames it over the target so
    /// a crash leaves either the previous or the new document.
    pub fn save(&self) -> Result<(), CacheError> {
        let json = serde_json::to_vec_pretty(&self.days)?;
        let tmp = tmp_path(&self.path);
        let io_err = |source| CacheError::Io {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut file = std::fs::File::create(&tmp).map_err(io_err)?;
        file.write_all(&json).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;

        tracing::trace!(path = %self.path.display(), "attendance cache saved");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn days(&self) -> &AttendanceDays {
        &self.days
    }

    pub fn day(&self, date: NaiveDate) -> Option<&BTreeMap<EmployeeCode, AttendanceRecord>> {
        self.days.get(&date)
    }

    pub fn get(&self, date: NaiveDate, employee: &str) -> Option<&AttendanceRecord> {
        self.days.get(&date).and_then(|d| d.get(employee))
    }

    pub fn get_mut(&mut self, date: NaiveDate, employee: &str) -> Option<&mut AttendanceRecord> {
        self.days.get_mut(&date).and_then(|d| d.get_mut(employee))
    }

    pub fn insert(&mut self, date: NaiveDate, employee: EmployeeCode, record: AttendanceRecord) {
        self.days.entry(date).or_default().insert(employee, record);
    }

    /// Remove one employee's record; drops the date key once it is empty.
    pub fn remove(&mut self, date: NaiveDate, employee: &str) -> Option<AttendanceRecord> {
        let day = self.days.get_mut(&date)?;
        let removed = day.remove(employee);
        if day.is_empty() {
            self.days.remove(&date);
        }
        removed
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "attendance_cache.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}

pub(crate) fn truncate_to_second(t: NaiveTime) -> NaiveTime {
    t.with_nanosecond(0).unwrap_or(t)
}

/// `NaiveTime` as `"HH:MM:SS"`.
mod hms {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M:%S";

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&t.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, "%H:%M:%S%.f").map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, day).unwrap()
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AttendanceCache::load(dir.path().join("attendance_cache.json"));
        assert!(cache.days().is_empty());
    }

    #[test]
    fn test_load_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attendance_cache.json");
        std::fs::write(&path, "{\"2026-10-16\": {\"E1\": ").unwrap();

        let cache = AttendanceCache::load(&path);
        assert!(cache.days().is_empty());
    }

    #[test]
    fn test_save_then_load_preserves_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attendance_cache.json");

        let mut cache = AttendanceCache::load(&path);
        cache.insert(
            d(15),
            EmployeeCode::from("E1"),
            AttendanceRecord {
                in_time: t(9, 0, 0),
                out_time: t(17, 30, 0),
                in_id: Some(CheckinId::new("EMP-CKIN-0001")),
                out_id: Some(CheckinId::new("EMP-CKIN-0002")),
            },
        );
        cache.insert(d(16), EmployeeCode::from("E2"), AttendanceRecord::opened_at(t(8, 15, 5)));
        cache.save().unwrap();

        let reloaded = AttendanceCache::load(&path);
        assert_eq!(reloaded.days(), cache.days());

        reloaded.save().unwrap();
        assert_eq!(AttendanceCache::load(&path).days(), cache.days());
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn test_file_layout_matches_wire_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attendance_cache.json");
        let mut cache = AttendanceCache::load(&path);
        cache.insert(d(16), EmployeeCode::from("E1"), AttendanceRecord::opened_at(t(9, 0, 0)));
        cache.save().unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(
            raw,
            serde_json::json!({
                "2026-10-16": {
                    "E1": { "in_time": "09:00:00", "out_time": "09:00:00", "in_id": null, "out_id": null }
                }
            })
        );
    }

    #[test]
    fn test_accepts_records_without_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attendance_cache.json");
        std::fs::write(
            &path,
            r#"{"2026-10-16":{"E1":{"in_time":"09:00:00","out_time":"10:00:00"}}}"#,
        )
        .unwrap();

        let cache = AttendanceCache::load(&path);
        let record = cache.get(d(16), "E1").unwrap();
        assert_eq!(record.out_time, t(10, 0, 0));
        assert!(record.in_id.is_none());
    }

    #[test]
    fn test_extend_to_only_moves_forward() {
        let mut record = AttendanceRecord::opened_at(t(9, 0, 0));
        record.extend_to(t(12, 0, 0));
        record.extend_to(t(11, 0, 0));
        assert_eq!(record.in_time, t(9, 0, 0));
        assert_eq!(record.out_time, t(12, 0, 0));
    }

    #[test]
    fn test_remove_drops_empty_day() {
        let mut cache = AttendanceCache::with_days("unused.json", AttendanceDays::new());
        cache.insert(d(16), EmployeeCode::from("E1"), AttendanceRecord::opened_at(t(9, 0, 0)));

        assert!(cache.remove(d(16), "E1").is_some());
        assert!(cache.day(d(16)).is_none());
        assert!(cache.remove(d(16), "E1").is_none());
    }
}
