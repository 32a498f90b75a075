use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    HistogramBin, Instrument, MAX_HISTOGRAM_BINS, MAX_TRIAL_COUNT, MonteCarloRun, ProfitSummary,
    ResultTable, SimulationError, SimulationParameters, equity_builder_win_rate, histogram,
    run_monte_carlo, summarize,
};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliInstrument {
    EquityBuilder,
    NoLvr,
}

impl From<CliInstrument> for Instrument {
    fn from(value: CliInstrument) -> Self {
        match value {
            CliInstrument::EquityBuilder => Instrument::EquityBuilder,
            CliInstrument::NoLvr => Instrument::NoLvr,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    annual_rate: Option<f64>,
    invested_amount: Option<f64>,
    max_monthly_investment: Option<f64>,
    simulations: Option<u32>,
    seed: Option<u64>,
    bins: Option<usize>,
    instruments: Option<String>,
    include_trials: Option<bool>,
}

#[derive(Parser, Debug)]
#[command(
    name = "equity-builder",
    about = "Monte Carlo comparison of a leveraged Equity Builder loan against staged No-LVR investing"
)]
struct Cli {
    #[arg(
        long,
        default_value_t = 3.9,
        help = "Annual loan interest rate in percent, e.g. 3.9"
    )]
    annual_rate: f64,
    #[arg(long, default_value_t = 10000.0, help = "Amount borrowed and invested")]
    invested_amount: f64,
    #[arg(
        long,
        default_value_t = 3000.0,
        help = "Monthly loan repayment, also the monthly amount staged without leverage"
    )]
    max_monthly_investment: f64,
    #[arg(long, default_value_t = 1000)]
    simulations: u32,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    #[arg(long, default_value_t = 100, help = "Histogram bins per instrument")]
    bins: usize,
    #[arg(
        long = "instrument",
        value_enum,
        help = "Instrument to report; repeat for several, defaults to all"
    )]
    instruments: Vec<CliInstrument>,
    #[arg(long, help = "Include every trial row in the report")]
    include_trials: bool,
}

#[derive(Debug)]
struct ApiRequest {
    params: SimulationParameters,
    bins: usize,
    instruments: Vec<Instrument>,
    include_trials: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InstrumentReport {
    instrument: Instrument,
    title: &'static str,
    summary: ProfitSummary,
    bins: Vec<HistogramBin>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    parameters: SimulationParameters,
    equity_builder_months: u32,
    interest_paid: f64,
    no_lvr_months: u32,
    horizon_months: u32,
    equity_builder_win_rate: f64,
    instruments: Vec<InstrumentReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trials: Option<ResultTable>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_inputs(cli: Cli) -> Result<ApiRequest, String> {
    if !cli.annual_rate.is_finite() || cli.annual_rate <= 0.0 {
        return Err("--annual-rate must be > 0".to_string());
    }

    if !cli.invested_amount.is_finite() || cli.invested_amount <= 0.0 {
        return Err("--invested-amount must be > 0".to_string());
    }

    if !cli.max_monthly_investment.is_finite() || cli.max_monthly_investment <= 0.0 {
        return Err("--max-monthly-investment must be > 0".to_string());
    }

    if cli.simulations == 0 {
        return Err("--simulations must be > 0".to_string());
    }
    if cli.simulations > MAX_TRIAL_COUNT {
        return Err(format!("--simulations must be <= {MAX_TRIAL_COUNT}"));
    }

    if cli.bins == 0 {
        return Err("--bins must be > 0".to_string());
    }
    if cli.bins > MAX_HISTOGRAM_BINS {
        return Err(format!("--bins must be <= {MAX_HISTOGRAM_BINS}"));
    }

    let params = SimulationParameters::new(
        cli.annual_rate / 100.0,
        cli.invested_amount,
        cli.max_monthly_investment,
        cli.simulations,
        cli.seed,
    )
    .map_err(|e| e.to_string())?;

    let mut instruments: Vec<Instrument> = Vec::new();
    for instrument in cli.instruments.into_iter().map(Instrument::from) {
        if !instruments.contains(&instrument) {
            instruments.push(instrument);
        }
    }
    if instruments.is_empty() {
        instruments = Instrument::ALL.to_vec();
    }

    Ok(ApiRequest {
        params,
        bins: cli.bins,
        instruments,
        include_trials: cli.include_trials,
    })
}

fn parse_instruments(raw: &str) -> Result<Vec<CliInstrument>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| match s {
            "eb" | "equity-builder" | "equityBuilder" | "equity_builder" | "EquityBuilder" => {
                Ok(CliInstrument::EquityBuilder)
            }
            "nL" | "no-lvr" | "noLvr" | "no_lvr" | "NoLVR" => Ok(CliInstrument::NoLvr),
            other => Err(format!("unknown instrument '{other}'")),
        })
        .collect()
}

pub fn run_cli(args: Vec<String>) -> Result<(), String> {
    let cli = Cli::try_parse_from(args).unwrap_or_else(|e| e.exit());
    let request = build_inputs(cli)?;
    let response = simulate(&request).map_err(|e| e.to_string())?;
    let json = serde_json::to_string_pretty(&response).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "equity builder HTTP API listening");
    info!("local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(Query(payload): Query<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_post_handler(Json(payload): Json<SimulatePayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => {
            warn!(error = %msg, "rejected simulate request");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    match tokio::task::spawn_blocking(move || simulate(&request)).await {
        Ok(Ok(response)) => json_response(StatusCode::OK, response),
        Ok(Err(e)) => {
            warn!(error = %e, "simulation failed");
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("simulation task failed: {e}"),
        ),
    }
}

fn simulate(request: &ApiRequest) -> Result<SimulateResponse, SimulationError> {
    let run = run_monte_carlo(&request.params)?;
    build_simulate_response(request, run)
}

fn build_simulate_response(
    request: &ApiRequest,
    run: MonteCarloRun,
) -> Result<SimulateResponse, SimulationError> {
    let MonteCarloRun {
        amortization,
        no_lvr_months,
        horizon_months,
        table,
    } = run;
    let mut instruments = Vec::with_capacity(request.instruments.len());
    for &instrument in &request.instruments {
        let values = table.column(instrument.column());
        let summary = summarize(&values).ok_or(SimulationError::EmptyHistogramInput)?;
        instruments.push(InstrumentReport {
            instrument,
            title: instrument.title(),
            summary,
            bins: histogram(&values, request.bins)?,
        });
    }

    Ok(SimulateResponse {
        parameters: request.params,
        equity_builder_months: amortization.months,
        interest_paid: amortization.interest_paid,
        no_lvr_months,
        horizon_months,
        equity_builder_win_rate: equity_builder_win_rate(&table),
        instruments,
        trials: request.include_trials.then_some(table),
    })
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: SimulatePayload) -> Result<ApiRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.annual_rate {
        cli.annual_rate = v;
    }
    if let Some(v) = payload.invested_amount {
        cli.invested_amount = v;
    }
    if let Some(v) = payload.max_monthly_investment {
        cli.max_monthly_investment = v;
    }
    if let Some(v) = payload.simulations {
        cli.simulations = v;
    }
    if let Some(v) = payload.seed {
        cli.seed = v;
    }
    if let Some(v) = payload.bins {
        cli.bins = v;
    }
    if let Some(v) = payload.instruments {
        cli.instruments = parse_instruments(&v)?;
        if cli.instruments.is_empty() {
            return Err("instruments must name at least one instrument".to_string());
        }
    }
    if let Some(v) = payload.include_trials {
        cli.include_trials = v;
    }

    build_inputs(cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        annual_rate: 3.9,
        invested_amount: 10_000.0,
        max_monthly_investment: 3_000.0,
        simulations: 1_000,
        seed: 42,
        bins: 100,
        instruments: Vec::new(),
        include_trials: false,
    }
}
