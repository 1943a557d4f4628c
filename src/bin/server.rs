use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use cutting_stock::CutError;
use cutting_stock::report::{PlanReport, build_report};
use cutting_stock::solver::{Solver, Strategy};
use cutting_stock::types::{Catalogue, OrderItem, StockType};
use serde::{Deserialize, Serialize};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Deserialize, Serialize)]
struct OptimizeRequest {
    stocks: Vec<StockType>,
    items: Vec<OrderItem>,
    #[serde(default)]
    strategy: Strategy,
}

fn error_status(err: &CutError) -> StatusCode {
    if err.is_input_error() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

async fn optimize(
    Json(req): Json<OptimizeRequest>,
) -> Result<Json<PlanReport>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /optimize"
    );

    let catalogue = Catalogue {
        stocks: req.stocks,
        items: req.items,
    };
    let problem = catalogue
        .into_problem()
        .map_err(|e| (error_status(&e), e.to_string()))?;

    let solver = Solver::new(problem, req.strategy);
    let result = tokio::task::spawn_blocking(move || {
        solver
            .solve()
            .map(|plan| build_report(&plan, solver.problem()))
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    match result {
        Ok(report) => Ok(Json(report)),
        Err(e) => {
            let status = error_status(&e);
            if status.is_server_error() {
                sentry::capture_error(&e);
                tracing::error!(error = %e, "optimization failed");
            }
            Err((status, e.to_string()))
        }
    }
}

fn app() -> Router {
    Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/optimize", post(optimize))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

fn main() -> std::io::Result<()> {
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    // Must outlive the runtime so queued events are flushed on shutdown
    let _sentry = std::env::var("SENTRY_DSN").ok().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async {
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            eprintln!("Listening on {addr}");
            axum::serve(listener, app()).await
        })
}
