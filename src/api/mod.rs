use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    CorpusMethod, Inputs, MAX_LIFE_EXPECTANCY, PlanError, PlanResult, SolverConfig,
    run_plan_with_config,
};

const MAX_SEARCH_ITERATIONS: u32 = 500;
const MIN_SEARCH_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PlanPayload {
    current_age: Option<u32>,
    retirement_age: Option<u32>,
    #[serde(alias = "lifeExpectancyAge")]
    life_expectancy: Option<u32>,

    #[serde(alias = "monthlyExpenseToday", alias = "expense")]
    monthly_expense: Option<f64>,
    #[serde(alias = "inflationRate")]
    inflation: Option<f64>,
    #[serde(alias = "preRetirementReturn")]
    pre_return: Option<f64>,
    #[serde(alias = "postRetirementReturn")]
    post_return: Option<f64>,

    #[serde(alias = "existingSavings")]
    existing_corpus: Option<f64>,
    #[serde(alias = "sip", alias = "monthlyContribution")]
    current_contribution: Option<f64>,
    #[serde(alias = "legacyTargetToday")]
    legacy: Option<f64>,
    #[serde(alias = "stepUpRate")]
    step_up: Option<f64>,

    closed_form: Option<bool>,
    search_upper_bound: Option<f64>,
    search_tolerance: Option<f64>,
    max_iterations: Option<u32>,
}

#[derive(Parser, Debug)]
#[command(
    name = "nestegg",
    about = "Retirement corpus planner: required corpus, shortfall, extra SIP and withdrawal table"
)]
struct Cli {
    #[arg(long)]
    current_age: u32,
    #[arg(long)]
    retirement_age: u32,
    #[arg(long, help = "Age the plan must fund through")]
    life_expectancy: u32,
    #[arg(long, help = "Monthly expense in today's money")]
    monthly_expense: f64,
    #[arg(
        long,
        default_value_t = 6.0,
        help = "Expected annual inflation in percent"
    )]
    inflation: f64,
    #[arg(
        long,
        default_value_t = 12.0,
        help = "Expected annual return before retirement in percent"
    )]
    pre_return: f64,
    #[arg(
        long,
        default_value_t = 8.0,
        help = "Expected annual return after retirement in percent; must exceed inflation"
    )]
    post_return: f64,
    #[arg(long, default_value_t = 0.0, help = "Savings already invested")]
    existing_corpus: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Monthly contribution already being invested (SIP)"
    )]
    current_contribution: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Amount to leave for heirs, in today's money"
    )]
    legacy: f64,
    #[arg(
        long,
        help = "Annual step-up of the monthly contribution in percent, applied at each anniversary"
    )]
    step_up: Option<f64>,
    #[arg(
        long,
        help = "Use the growing-annuity formula instead of the simulated search"
    )]
    closed_form: bool,
    #[arg(
        long,
        default_value_t = 1e10,
        help = "Largest corpus or contribution the search will consider"
    )]
    search_upper_bound: f64,
    #[arg(
        long,
        default_value_t = 0.01,
        help = "Bracket width at which the search stops, in currency units"
    )]
    search_tolerance: f64,
    #[arg(long, default_value_t = 200)]
    max_iterations: u32,
}

#[derive(Debug)]
struct ApiRequest {
    inputs: Inputs,
    config: SolverConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanResponse {
    current_age: u32,
    retirement_age: u32,
    life_expectancy: u32,
    #[serde(flatten)]
    result: PlanResult,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

fn build_inputs(cli: Cli) -> Result<ApiRequest, String> {
    if cli.retirement_age <= cli.current_age {
        return Err("--retirement-age must be > --current-age".to_string());
    }

    if cli.life_expectancy <= cli.retirement_age {
        return Err("--life-expectancy must be > --retirement-age".to_string());
    }

    if cli.life_expectancy > MAX_LIFE_EXPECTANCY {
        return Err(format!("--life-expectancy must be <= {MAX_LIFE_EXPECTANCY}"));
    }

    if !cli.monthly_expense.is_finite() || cli.monthly_expense <= 0.0 {
        return Err("--monthly-expense must be > 0".to_string());
    }

    for (name, rate) in [
        ("--inflation", cli.inflation),
        ("--pre-return", cli.pre_return),
        ("--post-return", cli.post_return),
    ] {
        if !(0.0..=100.0).contains(&rate) {
            return Err(format!("{name} must be between 0 and 100"));
        }
    }

    if let Some(step_up) = cli.step_up {
        if !(0.0..=100.0).contains(&step_up) {
            return Err("--step-up must be between 0 and 100".to_string());
        }
    }

    for (name, amount) in [
        ("--existing-corpus", cli.existing_corpus),
        ("--current-contribution", cli.current_contribution),
        ("--legacy", cli.legacy),
    ] {
        if !amount.is_finite() || amount < 0.0 {
            return Err(format!("{name} must be >= 0"));
        }
    }

    if !cli.search_upper_bound.is_finite() || cli.search_upper_bound <= 0.0 {
        return Err("--search-upper-bound must be > 0".to_string());
    }

    if !cli.search_tolerance.is_finite() || cli.search_tolerance < MIN_SEARCH_TOLERANCE {
        return Err(format!(
            "--search-tolerance must be >= {MIN_SEARCH_TOLERANCE}"
        ));
    }

    if cli.max_iterations == 0 || cli.max_iterations > MAX_SEARCH_ITERATIONS {
        return Err(format!(
            "--max-iterations must be between 1 and {MAX_SEARCH_ITERATIONS}"
        ));
    }

    Ok(ApiRequest {
        inputs: Inputs {
            current_age: cli.current_age,
            retirement_age: cli.retirement_age,
            life_expectancy: cli.life_expectancy,
            monthly_expense_today: cli.monthly_expense,
            inflation_rate_annual: cli.inflation,
            pre_retirement_return_annual: cli.pre_return,
            post_retirement_return_annual: cli.post_return,
            existing_corpus: cli.existing_corpus,
            current_monthly_contribution: cli.current_contribution,
            legacy_target_today: cli.legacy,
            contribution_step_up_rate_annual: cli.step_up.filter(|rate| *rate > 0.0),
            corpus_method: if cli.closed_form {
                CorpusMethod::ClosedForm
            } else {
                CorpusMethod::Simulated
            },
        },
        config: SolverConfig {
            upper_bound: cli.search_upper_bound,
            tolerance: cli.search_tolerance,
            max_iterations: cli.max_iterations,
        },
    })
}

/// Parses command-line flags, runs the plan and returns the response as pretty JSON.
pub fn run_cli<I, T>(args: I) -> Result<String, String>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::try_parse_from(args).map_err(|e| e.to_string())?;
    let request = build_inputs(cli)?;
    let result =
        run_plan_with_config(&request.inputs, request.config).map_err(|e| e.to_string())?;
    let response = build_plan_response(&request.inputs, result);
    serde_json::to_string_pretty(&response).map_err(|e| format!("Failed to encode result: {e}"))
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/healthz", get(health_handler))
        .route("/api/plan", get(plan_get_handler).post(plan_post_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "retirement planner HTTP API listening");
    info!("Local access: http://127.0.0.1:{port}/api/plan");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, serde_json::json!({ "status": "ok" }))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found", "not-found")
}

async fn plan_get_handler(Query(payload): Query<PlanPayload>) -> Response {
    plan_handler_impl(payload).await
}

async fn plan_post_handler(Json(payload): Json<PlanPayload>) -> Response {
    plan_handler_impl(payload).await
}

async fn plan_handler_impl(payload: PlanPayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => {
            warn!(error = %msg, "rejected plan request");
            return error_response(StatusCode::BAD_REQUEST, &msg, "invalid-input");
        }
    };

    match run_plan_with_config(&request.inputs, request.config) {
        Ok(result) => json_response(
            StatusCode::OK,
            build_plan_response(&request.inputs, result),
        ),
        Err(e) => {
            warn!(error = %e, code = e.code(), "plan computation failed");
            error_response(status_for_plan_error(&e), &e.to_string(), e.code())
        }
    }
}

fn status_for_plan_error(err: &PlanError) -> StatusCode {
    match err {
        PlanError::InvalidAgeOrder { .. } | PlanError::InvalidInput { .. } => {
            StatusCode::BAD_REQUEST
        }
        PlanError::UnsustainableWithdrawal { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        PlanError::SearchNonConvergence { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str, code: &'static str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
            code,
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<PlanPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: PlanPayload) -> Result<ApiRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.current_age {
        cli.current_age = v;
    }
    if let Some(v) = payload.retirement_age {
        cli.retirement_age = v;
    }
    if let Some(v) = payload.life_expectancy {
        cli.life_expectancy = v;
    }

    if let Some(v) = payload.monthly_expense {
        cli.monthly_expense = v;
    }
    if let Some(v) = payload.inflation {
        cli.inflation = v;
    }
    if let Some(v) = payload.pre_return {
        cli.pre_return = v;
    }
    if let Some(v) = payload.post_return {
        cli.post_return = v;
    }

    if let Some(v) = payload.existing_corpus {
        cli.existing_corpus = v;
    }
    if let Some(v) = payload.current_contribution {
        cli.current_contribution = v;
    }
    if let Some(v) = payload.legacy {
        cli.legacy = v;
    }
    if let Some(v) = payload.step_up {
        cli.step_up = Some(v);
    }

    if let Some(v) = payload.closed_form {
        cli.closed_form = v;
    }
    if let Some(v) = payload.search_upper_bound {
        cli.search_upper_bound = v;
    }
    if let Some(v) = payload.search_tolerance {
        cli.search_tolerance = v;
    }
    if let Some(v) = payload.max_iterations {
        cli.max_iterations = v;
    }

    build_inputs(cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        current_age: 30,
        retirement_age: 60,
        life_expectancy: 85,
        monthly_expense: 30_000.0,
        inflation: 6.0,
        pre_return: 12.0,
        post_return: 8.0,
        existing_corpus: 0.0,
        current_contribution: 0.0,
        legacy: 0.0,
        step_up: None,
        closed_form: false,
        search_upper_bound: 1e10,
        search_tolerance: 0.01,
        max_iterations: 200,
    }
}

fn build_plan_response(inputs: &Inputs, result: PlanResult) -> PlanResponse {
    PlanResponse {
        current_age: inputs.current_age,
        retirement_age: inputs.retirement_age,
        life_expectancy: inputs.life_expectancy,
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_cli() -> Cli {
        default_cli_for_api()
    }

    #[test]
    fn build_inputs_keeps_rates_in_percent() {
        let request = build_inputs(sample_cli()).expect("valid inputs");
        let inputs = request.inputs;
        assert_approx(inputs.inflation_rate_annual, 6.0);
        assert_approx(inputs.pre_retirement_return_annual, 12.0);
        assert_approx(inputs.post_retirement_return_annual, 8.0);
        assert_eq!(inputs.corpus_method, CorpusMethod::Simulated);
        assert_eq!(request.config, SolverConfig::default());
    }

    #[test]
    fn build_inputs_rejects_bad_age_order() {
        let mut cli = sample_cli();
        cli.retirement_age = 25;
        let err = build_inputs(cli).expect_err("must reject");
        assert!(err.contains("--retirement-age"));

        let mut cli = sample_cli();
        cli.life_expectancy = 60;
        let err = build_inputs(cli).expect_err("must reject");
        assert!(err.contains("--life-expectancy"));
    }

    #[test]
    fn build_inputs_rejects_negative_rates_and_amounts() {
        let mut cli = sample_cli();
        cli.pre_return = -1.0;
        let err = build_inputs(cli).expect_err("must reject");
        assert!(err.contains("--pre-return"));

        let mut cli = sample_cli();
        cli.legacy = -5.0;
        let err = build_inputs(cli).expect_err("must reject");
        assert!(err.contains("--legacy"));

        let mut cli = sample_cli();
        cli.step_up = Some(150.0);
        let err = build_inputs(cli).expect_err("must reject");
        assert!(err.contains("--step-up"));
    }

    #[test]
    fn build_inputs_treats_zero_step_up_as_flat() {
        let mut cli = sample_cli();
        cli.step_up = Some(0.0);
        let request = build_inputs(cli).expect("valid inputs");
        assert_eq!(request.inputs.contribution_step_up_rate_annual, None);
    }

    #[test]
    fn api_request_from_json_parses_web_keys() {
        let json = r#"{
          "currentAge": 35,
          "retirementAge": 58,
          "lifeExpectancy": 90,
          "monthlyExpense": 45000,
          "inflation": 6.5,
          "preReturn": 11,
          "postReturn": 7.5,
          "existingCorpus": 1500000,
          "sip": 20000,
          "legacy": 2500000,
          "stepUp": 5,
          "closedForm": true,
          "maxIterations": 80
        }"#;
        let request = api_request_from_json(json).expect("json should parse");
        let inputs = request.inputs;

        assert_eq!(inputs.current_age, 35);
        assert_eq!(inputs.retirement_age, 58);
        assert_eq!(inputs.life_expectancy, 90);
        assert_approx(inputs.monthly_expense_today, 45_000.0);
        assert_approx(inputs.inflation_rate_annual, 6.5);
        assert_approx(inputs.pre_retirement_return_annual, 11.0);
        assert_approx(inputs.post_retirement_return_annual, 7.5);
        assert_approx(inputs.existing_corpus, 1_500_000.0);
        assert_approx(inputs.current_monthly_contribution, 20_000.0);
        assert_approx(inputs.legacy_target_today, 2_500_000.0);
        assert_eq!(inputs.contribution_step_up_rate_annual, Some(5.0));
        assert_eq!(inputs.corpus_method, CorpusMethod::ClosedForm);
        assert_eq!(request.config.max_iterations, 80);
    }

    #[test]
    fn build_inputs_rejects_unrealistic_life_expectancy() {
        let mut cli = sample_cli();
        cli.life_expectancy = 300_000_000;
        let err = build_inputs(cli).expect_err("must reject");
        assert!(err.contains("--life-expectancy"));
    }

    #[test]
    fn api_request_from_json_rejects_unbounded_search_knobs() {
        let err = api_request_from_json(r#"{"searchTolerance": 1e-300}"#)
            .expect_err("tolerance below floor");
        assert!(err.contains("--search-tolerance"));

        let err = api_request_from_json(r#"{"maxIterations": 4000000000}"#)
            .expect_err("too many iterations");
        assert!(err.contains("--max-iterations"));
    }

    #[test]
    fn run_cli_returns_parse_errors() {
        let err = run_cli([
            "nestegg",
            "--current-age",
            "30",
            "--retirement-age",
            "60",
            "--life-expectancy",
            "85",
        ])
        .expect_err("missing required flag");
        assert!(err.contains("--monthly-expense"));
    }

    #[test]
    fn api_request_from_json_rejects_malformed_payload() {
        let err = api_request_from_json(r#"{"currentAge": "thirty"}"#).expect_err("bad type");
        assert!(err.contains("Invalid API JSON payload"));
    }

    #[test]
    fn plan_response_serialization_contains_expected_fields() {
        let request = build_inputs(sample_cli()).expect("valid inputs");
        let result = run_plan_with_config(&request.inputs, request.config).expect("plan");
        let response = build_plan_response(&request.inputs, result);
        let json = serde_json::to_string(&response).expect("response should serialize");

        for key in [
            "\"currentAge\"",
            "\"requiredCorpus\"",
            "\"projectedSavings\"",
            "\"shortfall\"",
            "\"requiredExtraContribution\"",
            "\"requiredExtraLumpsum\"",
            "\"legacyNominalValue\"",
            "\"withdrawalSchedule\"",
            "\"yearIndex\"",
            "\"remainingBalance\"",
            "\"corpusMethod\":\"simulated\"",
        ] {
            assert!(json.contains(key), "missing {key} in {json}");
        }
    }

    #[test]
    fn run_cli_prints_json_plan() {
        let json = run_cli([
            "nestegg",
            "--current-age",
            "30",
            "--retirement-age",
            "60",
            "--life-expectancy",
            "85",
            "--monthly-expense",
            "30000",
            "--inflation",
            "7",
        ])
        .expect("cli should succeed");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["withdrawalSchedule"].as_array().map(Vec::len), Some(25));
        assert!(value["requiredCorpus"].as_f64().expect("number") > 0.0);
    }

    #[test]
    fn run_cli_reports_unsustainable_plan() {
        let err = run_cli([
            "nestegg",
            "--current-age",
            "30",
            "--retirement-age",
            "60",
            "--life-expectancy",
            "85",
            "--monthly-expense",
            "30000",
            "--inflation",
            "7",
            "--post-return",
            "5",
        ])
        .expect_err("must fail");
        assert!(err.contains("exceed inflation"));
    }

    #[tokio::test]
    async fn handler_maps_errors_to_status_codes() {
        let ok = plan_handler_impl(PlanPayload::default()).await;
        assert_eq!(ok.status(), StatusCode::OK);
        assert_eq!(
            ok.headers().get(header::CACHE_CONTROL).map(|v| v.as_bytes()),
            Some(&b"no-store"[..])
        );

        let bad = plan_handler_impl(PlanPayload {
            retirement_age: Some(20),
            ..PlanPayload::default()
        })
        .await;
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let unsustainable = plan_handler_impl(PlanPayload {
            post_return: Some(5.0),
            ..PlanPayload::default()
        })
        .await;
        assert_eq!(unsustainable.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let capped = plan_handler_impl(PlanPayload {
            search_upper_bound: Some(1_000.0),
            ..PlanPayload::default()
        })
        .await;
        assert_eq!(capped.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
