mod common;

use common::{has_error_code, HrTestContext, HR, MANAGER};
use serde_json::{json, Value};

const LINES: &str = r#"
    query Lines($period: String!, $filter: PayrollFilter, $order: PayrollOrder) {
        hr { payroll(period: $period, filter: $filter, order: $order) {
            totalCount items { id employeeCode employeeName status netPayCents basicPayCents processedAt }
        } }
    }
"#;

const TRANSITION: &str = r#"
    mutation Move($ids: [UUID!]!, $target: PayrollStatus!) {
        hr { transitionPayroll(ids: $ids, target: $target) { employeeCode status processedAt } }
    }
"#;

async fn december(ctx: &HrTestContext) -> Vec<Value> {
    ctx.hr_ok(HR, LINES, json!({ "period": "2024-12" })).await["payroll"]["items"]
        .as_array()
        .unwrap()
        .clone()
}

fn line<'a>(lines: &'a [Value], code: &str) -> &'a Value {
    lines
        .iter()
        .find(|l| l["employeeCode"] == code)
        .unwrap_or_else(|| panic!("no payroll line for {code}"))
}

#[tokio::test]
async fn summary_totals_the_period() {
    let ctx = HrTestContext::new().await;
    let summary = r#"
        query Summary($period: String!, $filter: PayrollFilter) {
            hr { payrollSummary(period: $period, filter: $filter) {
                period totalPayrollCents processed totalEmployees averageNetCents totalTaxCents
            } }
        }
    "#;
    let december = ctx
        .hr_ok(HR, summary, json!({ "period": "2024-12" }))
        .await["payrollSummary"]
        .clone();
    assert_eq!(december["period"], "2024-12");
    assert_eq!(december["totalPayrollCents"], 5_175_000);
    assert_eq!(december["totalTaxCents"], 862_500);
    assert_eq!(december["averageNetCents"], 575_000);
    assert_eq!(december["processed"], 4);
    assert_eq!(december["totalEmployees"], 9);

    let pending = ctx
        .hr_ok(
            HR,
            summary,
            json!({ "period": "2024-12", "filter": { "status": "PENDING" } }),
        )
        .await["payrollSummary"]
        .clone();
    assert_eq!(pending["totalEmployees"], 2);
    assert_eq!(pending["totalPayrollCents"], 945_000);

    let empty = ctx
        .hr_ok(HR, summary, json!({ "period": "2023-01" }))
        .await["payrollSummary"]
        .clone();
    assert_eq!(empty["totalEmployees"], 0);
    assert_eq!(empty["averageNetCents"], 0);

    let resp = ctx
        .exec_as(HR, summary, json!({ "period": "2024-13" }))
        .await;
    assert!(has_error_code(&resp, "VALIDATION"));
}

#[tokio::test]
async fn listing_orders_and_filters_lines() {
    let ctx = HrTestContext::new().await;
    let by_net = ctx
        .hr_ok(
            HR,
            LINES,
            json!({ "period": "2024-12", "order": "NET_PAY_DESC" }),
        )
        .await["payroll"]
        .clone();
    assert_eq!(by_net["totalCount"], 9);
    assert_eq!(by_net["items"][0]["employeeCode"], "EMP102");
    assert_eq!(by_net["items"][0]["netPayCents"], 900_000);
    assert_eq!(by_net["items"][1]["employeeCode"], "EMP100");

    let interns = ctx
        .hr_ok(
            HR,
            LINES,
            json!({ "period": "2024-12", "filter": { "employmentType": "INTERN" } }),
        )
        .await["payroll"]
        .clone();
    assert_eq!(interns["totalCount"], 1);
    assert_eq!(interns["items"][0]["employeeName"], "Priya Patel");
    assert_eq!(interns["items"][0]["status"], "DRAFT");

    let processed = line(&december(&ctx).await, "EMP001").clone();
    assert_eq!(processed["status"], "PROCESSED");
    assert!(processed["processedAt"].is_string());
}

#[tokio::test]
async fn processed_lines_cannot_be_edited() {
    let ctx = HrTestContext::new().await;
    let upsert = r#"
        mutation Upsert($input: PayrollLineInput!) {
            hr { upsertPayrollLine(input: $input) { id status netPayCents } }
        }
    "#;
    let resp = ctx
        .exec_as(
            HR,
            upsert,
            json!({ "input": {
                "employeeId": ctx.employee_id("EMP001"),
                "period": "2024-12",
                "basicPayCents": 800_000
            } }),
        )
        .await;
    assert!(has_error_code(&resp, "CONFLICT"));

    let pending = line(&december(&ctx).await, "EMP003").clone();
    let edited = ctx
        .hr_ok(
            HR,
            upsert,
            json!({ "input": {
                "employeeId": ctx.employee_id("EMP003"),
                "period": "2024-12",
                "basicPayCents": 420_000,
                "allowancesCents": 20_000,
                "taxCents": 60_000
            } }),
        )
        .await["upsertPayrollLine"]
        .clone();
    assert_eq!(edited["id"], pending["id"]);
    assert_eq!(edited["status"], "DRAFT");
    assert_eq!(edited["netPayCents"], 380_000);

    let fresh = ctx
        .hr_ok(
            HR,
            upsert,
            json!({ "input": {
                "employeeId": ctx.employee_id("EMP001"),
                "period": "2025-01",
                "basicPayCents": 750_000
            } }),
        )
        .await["upsertPayrollLine"]
        .clone();
    assert_eq!(fresh["status"], "DRAFT");
    assert_eq!(fresh["netPayCents"], 750_000);

    let resp = ctx
        .exec_as(
            HR,
            upsert,
            json!({ "input": {
                "employeeId": ctx.employee_id("EMP001"),
                "period": "2025-02",
                "basicPayCents": 100,
                "taxCents": 500
            } }),
        )
        .await;
    assert!(has_error_code(&resp, "VALIDATION"));

    let resp = ctx
        .exec_as(
            HR,
            upsert,
            json!({ "input": {
                "employeeId": ctx.employee_id("EMP001"),
                "period": "2025-02",
                "basicPayCents": i64::MAX,
                "allowancesCents": 1
            } }),
        )
        .await;
    assert!(has_error_code(&resp, "VALIDATION"));
}

#[tokio::test]
async fn transitions_follow_the_workflow() {
    let ctx = HrTestContext::new().await;
    let lines = december(&ctx).await;
    let draft = line(&lines, "EMP006")["id"].clone();
    let pending = line(&lines, "EMP003")["id"].clone();
    let approved = line(&lines, "EMP002")["id"].clone();

    let resp = ctx
        .exec_as(
            HR,
            TRANSITION,
            json!({ "ids": [draft, pending], "target": "APPROVED" }),
        )
        .await;
    assert!(has_error_code(&resp, "CONFLICT"));
    let after = december(&ctx).await;
    assert_eq!(line(&after, "EMP003")["status"], "PENDING");
    assert_eq!(line(&after, "EMP006")["status"], "DRAFT");

    let moved = ctx
        .hr_ok(HR, TRANSITION, json!({ "ids": [draft], "target": "PENDING" }))
        .await["transitionPayroll"]
        .clone();
    assert_eq!(moved[0]["status"], "PENDING");

    let paid = ctx
        .hr_ok(
            HR,
            TRANSITION,
            json!({ "ids": [approved], "target": "PROCESSED" }),
        )
        .await["transitionPayroll"]
        .clone();
    assert_eq!(paid[0]["employeeCode"], "EMP002");
    assert_eq!(paid[0]["status"], "PROCESSED");
    assert!(paid[0]["processedAt"].is_string());

    let resp = ctx
        .exec_as(HR, TRANSITION, json!({ "ids": [], "target": "PENDING" }))
        .await;
    assert!(has_error_code(&resp, "VALIDATION"));
}

#[tokio::test]
async fn trend_fills_missing_months() {
    let ctx = HrTestContext::new().await;
    let trend = r#"
        query Trend($until: String!, $months: Int) {
            hr { payrollTrend(untilPeriod: $until, months: $months) {
                period totalNetCents totalTaxCents headcount
            } }
        }
    "#;
    let points = ctx
        .hr_ok(HR, trend, json!({ "until": "2024-12", "months": 3 }))
        .await["payrollTrend"]
        .clone();
    let periods: Vec<&str> = points
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["period"].as_str().unwrap())
        .collect();
    assert_eq!(periods, vec!["2024-10", "2024-11", "2024-12"]);
    assert_eq!(points[0]["headcount"], 0);
    assert_eq!(points[0]["totalNetCents"], 0);
    assert_eq!(points[1]["headcount"], 9);
    assert_eq!(points[1]["totalNetCents"], 5_175_000);
    assert_eq!(points[2]["totalTaxCents"], 862_500);

    let defaulted = ctx
        .hr_ok(HR, trend, json!({ "until": "2025-01" }))
        .await["payrollTrend"]
        .clone();
    assert_eq!(defaulted.as_array().unwrap().len(), 6);
    assert_eq!(defaulted[0]["period"], "2024-08");

    let resp = ctx
        .exec_as(HR, trend, json!({ "until": "2024-12", "months": 0 }))
        .await;
    assert!(has_error_code(&resp, "VALIDATION"));
}

#[tokio::test]
async fn payroll_is_hr_only() {
    let ctx = HrTestContext::new().await;
    let resp = ctx
        .exec_as(MANAGER, LINES, json!({ "period": "2024-12" }))
        .await;
    assert!(has_error_code(&resp, "FORBIDDEN"));
}
