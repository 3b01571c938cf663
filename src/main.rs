use axum::{
    routing::{get, post},
    Router,
};
use lms_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    middleware::{auth, cors, rate_limit},
    routes, AppState,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let staff_api = Router::new()
        .route(
            "/api/assessments",
            get(routes::assessment::list_assessments).post(routes::assessment::create_assessment),
        )
        .route(
            "/api/assessments/questions",
            get(routes::assessment::list_bank_questions),
        )
        .route(
            "/api/assessments/:id",
            get(routes::assessment::get_assessment)
                .put(routes::assessment::update_assessment)
                .delete(routes::assessment::delete_assessment),
        )
        .route(
            "/api/assessments/:id/publish",
            post(routes::assessment::publish_assessment),
        )
        .route(
            "/api/assessments/:id/analytics",
            get(routes::assessment::assessment_analytics),
        )
        .layer(axum::middleware::from_fn(auth::require_staff))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::new_rps_state(config.staff_rps),
            rate_limit::rps_middleware,
        ));

    let student_api = Router::new()
        .route(
            "/api/student-assessments/available",
            get(routes::student_assessment::available_assessments),
        )
        .route(
            "/api/student-assessments/results",
            get(routes::student_assessment::my_results),
        )
        .route(
            "/api/student-assessments/:id/start",
            post(routes::student_assessment::start_assessment),
        )
        .route(
            "/api/student-assessments/:id/answer",
            axum::routing::put(routes::student_assessment::submit_answer),
        )
        .route(
            "/api/student-assessments/:id/submit",
            post(routes::student_assessment::submit_assessment),
        )
        .layer(axum::middleware::from_fn(auth::require_student))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::new_rps_state(config.student_rps),
            rate_limit::rps_middleware,
        ));

    let app = base_routes
        .merge(staff_api)
        .merge(student_api)
        .layer(cors::permissive_cors())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let listener = TcpListener::bind(&config.server_address).await?;
    info!("listening on {}", config.server_address);
    axum::serve(listener, app).await?;

    Ok(())
}
