use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use facesync_core::config::ServiceAccount;
use facesync_core::{
    AttendanceApi, AttendanceSubmission, CheckinId, EmployeeCode, LogType, RemoteError,
    ShiftLookupError,
};
use facesync_erp::ErpClient;
use mockito::Matcher;
use serde_json::json;
use std::time::Duration;

fn account() -> ServiceAccount {
    ServiceAccount {
        api_key: "key".into(),
        api_secret: "secret".into(),
    }
}

fn client(server: &mockito::Server) -> ErpClient {
    ErpClient::new(&server.url(), &account(), Duration::from_secs(5)).unwrap()
}

fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 16)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn path(pattern: &str) -> Matcher {
    Matcher::Regex(format!("^{}$", pattern.replace(' ', "(%20| )")))
}

#[test]
fn create_checkin_posts_payload_and_returns_name() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", path("/api/resource/Employee Checkin"))
        .match_header("authorization", "token key:secret")
        .match_body(Matcher::Json(json!({
            "employee": "E1",
            "log_type": "IN",
            "time": "2026-10-16 09:00:00",
            "device_id": "lobby"
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data":{"name":"EMP-CKIN-10-2026-000001","employee":"E1"}}"#)
        .create();

    let api = client(&server).with_device_id("lobby");
    let id = api
        .create_checkin(&EmployeeCode::from("E1"), at(9, 0), LogType::In)
        .unwrap();

    assert_eq!(id, CheckinId::new("EMP-CKIN-10-2026-000001"));
    mock.assert();
}

#[test]
fn create_checkin_server_error_is_http() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("POST", path("/api/resource/Employee Checkin"))
        .with_status(417)
        .with_body(r#"{"exc_type":"ValidationError"}"#)
        .create();

    let err = client(&server)
        .create_checkin(&EmployeeCode::from("E1"), at(9, 0), LogType::Out)
        .unwrap_err();

    match err {
        RemoteError::Http { status, body } => {
            assert_eq!(status, 417);
            assert!(body.contains("ValidationError"));
        }
        other => panic!("expected Http, got {other:?}"),
    }
}

#[test]
fn create_checkin_garbage_response_is_decode_error() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("POST", path("/api/resource/Employee Checkin"))
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .create();

    let err = client(&server)
        .create_checkin(&EmployeeCode::from("E1"), at(9, 0), LogType::In)
        .unwrap_err();
    assert!(matches!(err, RemoteError::Decode(_)));
}

#[test]
fn update_checkin_puts_time() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("PUT", path("/api/resource/Employee Checkin/EMP-CKIN-2"))
        .match_header("authorization", "token key:secret")
        .match_body(Matcher::Json(json!({"time": "2026-10-16 17:30:00"})))
        .with_status(200)
        .with_body(r#"{"data":{"name":"EMP-CKIN-2"}}"#)
        .create();

    let id = client(&server)
        .update_checkin(&CheckinId::new("EMP-CKIN-2"), at(17, 30))
        .unwrap();

    assert_eq!(id, CheckinId::new("EMP-CKIN-2"));
    mock.assert();
}

#[test]
fn update_checkin_missing_record_is_not_found() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("PUT", path("/api/resource/Employee Checkin/GONE"))
        .with_status(404)
        .with_body(r#"{"exc_type":"DoesNotExistError"}"#)
        .create();
    let create = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create();

    let err = client(&server)
        .update_checkin(&CheckinId::new("GONE"), at(12, 0))
        .unwrap_err();

    assert!(err.is_not_found());
    create.assert();
}

#[test]
fn fetch_shift_follows_employee_to_shift_type() {
    let mut server = mockito::Server::new();
    let _emp = server
        .mock("GET", path("/api/resource/Employee/E1"))
        .with_status(200)
        .with_body(r#"{"data":{"name":"E1","default_shift":"Day Shift"}}"#)
        .create();
    let _shift = server
        .mock("GET", path("/api/resource/Shift Type/Day Shift"))
        .with_status(200)
        .with_body(r#"{"data":{"name":"Day Shift","start_time":"9:00:00","end_time":"17:00:00"}}"#)
        .create();

    let shift = client(&server).fetch_shift(&EmployeeCode::from("E1")).unwrap();

    assert_eq!(shift.start, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    assert_eq!(shift.end, NaiveTime::from_hms_opt(17, 0, 0).unwrap());
}

#[test]
fn fetch_shift_without_assignment() {
    let mut server = mockito::Server::new();
    let _emp = server
        .mock("GET", path("/api/resource/Employee/E1"))
        .with_status(200)
        .with_body(r#"{"data":{"name":"E1","default_shift":null}}"#)
        .create();

    let err = client(&server).fetch_shift(&EmployeeCode::from("E1")).unwrap_err();
    assert!(matches!(err, ShiftLookupError::NoShiftAssigned));
}

#[test]
fn fetch_shift_without_times() {
    let mut server = mockito::Server::new();
    let _emp = server
        .mock("GET", path("/api/resource/Employee/E1"))
        .with_status(200)
        .with_body(r#"{"data":{"shift_type":"Flex"}}"#)
        .create();
    let _shift = server
        .mock("GET", path("/api/resource/Shift Type/Flex"))
        .with_status(200)
        .with_body(r#"{"data":{"name":"Flex","start_time":"9:00:00"}}"#)
        .create();

    let err = client(&server).fetch_shift(&EmployeeCode::from("E1")).unwrap_err();
    assert!(matches!(err, ShiftLookupError::MissingShiftTimes { ref shift } if shift == "Flex"));
}

#[test]
fn fetch_shift_unknown_employee() {
    let mut server = mockito::Server::new();
    let _emp = server
        .mock("GET", path("/api/resource/Employee/NOPE"))
        .with_status(404)
        .create();

    let err = client(&server).fetch_shift(&EmployeeCode::from("NOPE")).unwrap_err();
    assert!(matches!(err, ShiftLookupError::Remote(RemoteError::NotFound)));
}

#[test]
fn submit_attendance_posts_present_status() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", path("/api/resource/Attendance"))
        .match_header("authorization", "token key:secret")
        .match_body(Matcher::Json(json!({
            "employee": "E1",
            "attendance_date": "2026-10-16",
            "in_time": "09:00:00",
            "out_time": "17:30:00",
            "status": "Present"
        })))
        .with_status(200)
        .with_body(r#"{"data":{"name":"HR-ATT-0001"}}"#)
        .create();

    client(&server)
        .submit_attendance(&AttendanceSubmission {
            employee: EmployeeCode::from("E1"),
            date: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            in_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            out_time: NaiveTime::from_hms_opt(17, 30, 0).unwrap(),
        })
        .unwrap();

    mock.assert();
}

#[test]
fn unreachable_server_is_connection_error() {
    let api = ErpClient::new("http://127.0.0.1:1", &account(), Duration::from_secs(2)).unwrap();
    let err = api
        .create_checkin(&EmployeeCode::from("E1"), at(9, 0), LogType::In)
        .unwrap_err();
    assert!(matches!(err, RemoteError::Connection(_) | RemoteError::Timeout));
}
