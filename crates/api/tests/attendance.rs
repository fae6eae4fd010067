mod common;

use common::{has_error_code, HrTestContext, EMPLOYEE, MANAGER};
use serde_json::json;

const RECORD: &str = r#"
    mutation Record($input: AttendanceInput!) {
        hr { recordAttendance(input: $input) { id status lateMarks workedMinutes workedHours employeeName } }
    }
"#;

const STATS: &str = r#"
    query Stats($date: NaiveDate!, $departmentId: UUID) {
        hr { attendanceStats(date: $date, departmentId: $departmentId) {
            totalEmployees present late absent onLeave unrecorded attendanceRate averageHours
        } }
    }
"#;

#[tokio::test]
async fn daily_stats_count_the_whole_roster() {
    let ctx = HrTestContext::new().await;
    let stats = ctx
        .hr_ok(MANAGER, STATS, json!({ "date": "2025-01-15" }))
        .await["attendanceStats"]
        .clone();
    assert_eq!(stats["totalEmployees"], 9);
    assert_eq!(stats["present"], 6);
    assert_eq!(stats["late"], 1);
    assert_eq!(stats["absent"], 1);
    assert_eq!(stats["onLeave"], 1);
    assert_eq!(stats["unrecorded"], 1);
    assert_eq!(stats["attendanceRate"], 66.7);
    assert_eq!(stats["averageHours"], 7.89);

    let engineering = ctx.seeded.department_named("Engineering").unwrap().id;
    let eng = ctx
        .hr_ok(
            MANAGER,
            STATS,
            json!({ "date": "2025-01-15", "departmentId": engineering }),
        )
        .await["attendanceStats"]
        .clone();
    assert_eq!(eng["totalEmployees"], 4);
    assert_eq!(eng["present"], 3);
    assert_eq!(eng["absent"], 1);
    assert_eq!(eng["attendanceRate"], 75.0);

    let empty_day = ctx
        .hr_ok(MANAGER, STATS, json!({ "date": "2025-03-01" }))
        .await["attendanceStats"]
        .clone();
    assert_eq!(empty_day["unrecorded"], 9);
    assert_eq!(empty_day["attendanceRate"], 0.0);
}

#[tokio::test]
async fn recording_twice_updates_the_same_day() {
    let ctx = HrTestContext::new().await;
    let admin_employee = ctx.employee_id("EMP100");
    let first = ctx
        .hr_ok(
            MANAGER,
            RECORD,
            json!({ "input": {
                "employeeId": admin_employee,
                "workDate": "2025-01-15",
                "checkIn": "09:40:00",
                "checkOut": "18:10:00"
            } }),
        )
        .await["recordAttendance"]
        .clone();
    assert_eq!(first["status"], "LATE");
    assert_eq!(first["lateMarks"], 1);
    assert_eq!(first["workedMinutes"], 510);
    assert_eq!(first["workedHours"], 8.5);
    assert_eq!(first["employeeName"], "System Administrator");

    let second = ctx
        .hr_ok(
            MANAGER,
            RECORD,
            json!({ "input": {
                "employeeId": admin_employee,
                "workDate": "2025-01-15",
                "status": "LEAVE",
                "checkIn": "09:40:00"
            } }),
        )
        .await["recordAttendance"]
        .clone();
    assert_eq!(second["id"], first["id"]);
    assert_eq!(second["status"], "LEAVE");
    assert_eq!(second["workedMinutes"], 0);

    let stats = ctx
        .hr_ok(MANAGER, STATS, json!({ "date": "2025-01-15" }))
        .await["attendanceStats"]
        .clone();
    assert_eq!(stats["unrecorded"], 0);
    assert_eq!(stats["onLeave"], 2);
}

#[tokio::test]
async fn check_out_before_check_in_is_rejected() {
    let ctx = HrTestContext::new().await;
    let resp = ctx
        .exec_as(
            MANAGER,
            RECORD,
            json!({ "input": {
                "employeeId": ctx.employee_id("EMP001"),
                "workDate": "2025-01-16",
                "checkIn": "17:00:00",
                "checkOut": "09:00:00"
            } }),
        )
        .await;
    assert!(has_error_code(&resp, "VALIDATION"));
}

#[tokio::test]
async fn listing_filters_and_orders_in_one_pass() {
    let ctx = HrTestContext::new().await;
    let list = r#"
        query List($filter: AttendanceFilter, $order: AttendanceOrder, $first: Int) {
            hr { attendance(filter: $filter, order: $order, first: $first) {
                totalCount items { employeeCode workDate status workedMinutes }
            } }
        }
    "#;
    let late = ctx
        .hr_ok(MANAGER, list, json!({ "filter": { "status": "LATE" }, "order": "DATE_ASC" }))
        .await["attendance"]
        .clone();
    assert_eq!(late["totalCount"], 3);
    let dates: Vec<&str> = late["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["workDate"].as_str().unwrap())
        .collect();
    assert_eq!(dates, vec!["2025-01-13", "2025-01-14", "2025-01-15"]);

    let longest = ctx
        .hr_ok(
            MANAGER,
            list,
            json!({ "filter": { "from": "2025-01-14", "to": "2025-01-15" }, "order": "HOURS_DESC", "first": 2 }),
        )
        .await["attendance"]
        .clone();
    assert_eq!(longest["totalCount"], 10);
    assert_eq!(longest["items"][0]["employeeCode"], "EMP003");
    assert_eq!(longest["items"][0]["workedMinutes"], 780);
    assert_eq!(longest["items"][1]["employeeCode"], "EMP102");

    let by_name = ctx
        .hr_ok(MANAGER, list, json!({ "filter": { "q": "wilson" } }))
        .await["attendance"]
        .clone();
    assert_eq!(by_name["totalCount"], 2);
}

#[tokio::test]
async fn bulk_status_recomputes_hours() {
    let ctx = HrTestContext::new().await;
    let ids = r#"
        query { hr { attendance(filter: { from: "2025-01-15", to: "2025-01-15", q: "EMP00" }) { items { id employeeCode } } } }
    "#;
    let rows = ctx.hr_ok(MANAGER, ids, json!({})).await["attendance"]["items"].clone();
    let ids: Vec<String> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids.len(), 6);

    let bulk = r#"
        mutation Bulk($ids: [UUID!]!) { hr { setAttendanceStatus(ids: $ids, status: HOLIDAY) } }
    "#;
    let updated = ctx.hr_ok(MANAGER, bulk, json!({ "ids": ids })).await;
    assert_eq!(updated["setAttendanceStatus"], 6);

    let stats = ctx
        .hr_ok(MANAGER, STATS, json!({ "date": "2025-01-15" }))
        .await["attendanceStats"]
        .clone();
    assert_eq!(stats["present"], 2);
    assert_eq!(stats["averageHours"], 9.25);
}

#[tokio::test]
async fn anomalies_are_rule_based_and_newest_first() {
    let ctx = HrTestContext::new().await;
    let query = r#"
        query { hr { attendanceAnomalies(from: "2025-01-13", to: "2025-01-15") {
            employeeCode workDate kind confidence recommendations
        } } }
    "#;
    let found = ctx.hr_ok(MANAGER, query, json!({})).await["attendanceAnomalies"].clone();
    let summary: Vec<(String, String, String, i64)> = found
        .as_array()
        .unwrap()
        .iter()
        .map(|a| {
            (
                a["employeeCode"].as_str().unwrap().to_string(),
                a["workDate"].as_str().unwrap().to_string(),
                a["kind"].as_str().unwrap().to_string(),
                a["confidence"].as_i64().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            ("EMP002".into(), "2025-01-15".into(), "UNUSUAL_PATTERN".into(), 60),
            ("EMP003".into(), "2025-01-14".into(), "SUSPICIOUS_TIMING".into(), 85),
            ("EMP003".into(), "2025-01-14".into(), "EXTENDED_HOURS".into(), 72),
        ]
    );
    assert!(!found[0]["recommendations"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn attendance_requires_manager() {
    let ctx = HrTestContext::new().await;
    let resp = ctx
        .exec_as(EMPLOYEE, STATS, json!({ "date": "2025-01-15" }))
        .await;
    assert!(has_error_code(&resp, "FORBIDDEN"));
}
