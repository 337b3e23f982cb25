use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::db::{create_pool, init_database_with_pool, seed_initial_teams};
use crate::error::LeagueResult;
use crate::models::{
    ApiResponse, CreateLeagueRequest, CreateMatchRequest, EditMatchRequest, League,
    LeagueSimulationResult, Match, PredictionResult, Standings, Team, TeamRequest,
};
use crate::services::{LeagueLocks, LeagueService, MatchService, Predictor, TeamService};

#[derive(Clone)]
pub struct AppState {
    pub teams: TeamService,
    pub matches: MatchService,
    pub leagues: LeagueService,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: &Config) -> Self {
        let locks = LeagueLocks::default();
        let predictor = Predictor::new(config.simulation_runs, config.min_prediction_week);
        Self {
            teams: TeamService::new(pool.clone()),
            matches: MatchService::new(pool.clone(), locks.clone()),
            leagues: LeagueService::new(pool, locks, predictor),
        }
    }
}

pub async fn serve(config: &Config, port: u16) -> anyhow::Result<()> {
    let pool = create_pool(&config.database_url).await?;
    init_database_with_pool(&pool).await?;
    seed_initial_teams(&pool).await?;

    let app = create_router().with_state(AppState::new(pool, config));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!("League simulator API listening on port {}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Every route is served both at the root and under `/api`.
fn create_router() -> Router<AppState> {
    let routes = league_routes();
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", routes.clone())
        .merge(routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

fn league_routes() -> Router<AppState> {
    Router::new()
        .route("/teams", get(list_teams_handler).post(create_team_handler))
        .route("/teams/initialize", post(initialize_teams_handler))
        .route(
            "/teams/{id}",
            get(get_team_handler)
                .put(update_team_handler)
                .delete(delete_team_handler),
        )
        .route("/matches", get(list_matches_handler).post(create_match_handler))
        .route(
            "/matches/{id}",
            get(get_match_handler)
                .put(edit_match_handler)
                .delete(delete_match_handler),
        )
        .route("/leagues", post(create_league_handler))
        .route("/leagues/{id}", get(get_league_handler))
        .route("/leagues/{id}/simulate", post(simulate_week_handler))
        .route("/leagues/{id}/simulate-all", post(simulate_all_handler))
        .route("/leagues/{id}/standings", get(standings_handler))
        .route("/leagues/{id}/weeks/{week}/matches", get(weekly_matches_handler))
        .route("/leagues/{id}/predict", get(predict_handler))
        .route("/leagues/{id}/predictions", get(predictions_handler))
}

type ApiResult<T> = LeagueResult<Json<ApiResponse<T>>>;
type Created<T> = LeagueResult<(StatusCode, Json<ApiResponse<T>>)>;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

fn created<T>(data: T) -> Created<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::success(data))))
}

async fn health_check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("League simulator API is running"))
}

// Teams

async fn list_teams_handler(State(state): State<AppState>) -> ApiResult<Vec<Team>> {
    ok(state.teams.list().await?)
}

async fn get_team_handler(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Team> {
    ok(state.teams.get(id).await?)
}

async fn create_team_handler(
    State(state): State<AppState>,
    Json(request): Json<TeamRequest>,
) -> Created<Team> {
    created(state.teams.create(request).await?)
}

async fn update_team_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<TeamRequest>,
) -> ApiResult<Team> {
    ok(state.teams.update(id, request).await?)
}

async fn delete_team_handler(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<String> {
    state.teams.delete(id).await?;
    ok(format!("Team {} deleted", id))
}

async fn initialize_teams_handler(State(state): State<AppState>) -> Created<Vec<Team>> {
    created(state.teams.create_initial_teams().await?)
}

// Matches

#[derive(Deserialize)]
struct MatchesQuery {
    week: Option<i32>,
}

async fn list_matches_handler(
    State(state): State<AppState>,
    Query(params): Query<MatchesQuery>,
) -> ApiResult<Vec<Match>> {
    ok(state.matches.list(params.week).await?)
}

async fn get_match_handler(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Match> {
    ok(state.matches.get(id).await?)
}

async fn create_match_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateMatchRequest>,
) -> Created<Match> {
    created(state.matches.create(request).await?)
}

async fn edit_match_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<EditMatchRequest>,
) -> ApiResult<Match> {
    ok(state.matches.edit_result(id, request).await?)
}

async fn delete_match_handler(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<String> {
    state.matches.delete(id).await?;
    ok(format!("Match {} deleted", id))
}

// Leagues

async fn create_league_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateLeagueRequest>,
) -> Created<League> {
    created(state.leagues.create_league(request).await?)
}

async fn get_league_handler(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<League> {
    ok(state.leagues.get_league(id).await?)
}

async fn simulate_week_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Standings> {
    ok(state.leagues.simulate_week(id).await?)
}

async fn simulate_all_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<LeagueSimulationResult> {
    ok(state.leagues.simulate_all_weeks(id).await?)
}

async fn standings_handler(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Standings> {
    ok(state.leagues.current_standings(id).await?)
}

async fn weekly_matches_handler(
    State(state): State<AppState>,
    Path((id, week)): Path<(i64, i32)>,
) -> ApiResult<Vec<Match>> {
    ok(state.leagues.weekly_matches(id, week).await?)
}

async fn predict_handler(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Standings> {
    ok(state.leagues.predict_final_standings(id).await?)
}

async fn predictions_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<PredictionResult> {
    ok(state.leagues.prediction_with_confidence(id).await?)
}
