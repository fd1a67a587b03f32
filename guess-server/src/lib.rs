use std::sync::Arc;

use guess_core::{FailureClass, GuessService, LedgerError};
use guess_types::{ErrorCode, ErrorResponse, RecordGuessRequest};
use warp::Filter;
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};

pub mod config;

const MAX_BODY_BYTES: u64 = 16 * 1024;

pub fn create_routes(
    guess_service: Arc<GuessService>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let service_filter = warp::any().map(move || guess_service.clone());

    let record_guess = warp::path!("games" / String / "guesses")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(service_filter.clone())
        .and_then(handle_record_guess);

    let list_guesses = warp::path!("games" / String / "guesses")
        .and(warp::get())
        .and(service_filter.clone())
        .and_then(handle_list_guesses);

    let unique_guessers = warp::path!("games" / String / "guessers")
        .and(warp::get())
        .and(service_filter.clone())
        .and_then(handle_unique_guessers);

    let latest_guess = warp::path!("games" / String / "guessers" / String / "latest")
        .and(warp::get())
        .and(service_filter.clone())
        .and_then(handle_latest_guess);

    let statistics = warp::path!("games" / String / "stats")
        .and(warp::get())
        .and(service_filter.clone())
        .and_then(handle_statistics);

    // Health check endpoint
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", StatusCode::OK));

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET", "POST"]);

    record_guess
        .or(list_guesses)
        .or(unique_guessers)
        .or(latest_guess)
        .or(statistics)
        .or(health)
        .with(cors)
        .with(warp::log("guess_ledger"))
}

fn error_reply(game_id: &str, err: &LedgerError) -> WithStatus<Json> {
    let status = match err.class() {
        FailureClass::Validation => StatusCode::BAD_REQUEST,
        FailureClass::Connection => StatusCode::SERVICE_UNAVAILABLE,
        FailureClass::Data => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!("Request for game {} failed: {}", game_id, err);
    } else {
        tracing::debug!("Rejected request for game {}: {}", game_id, err);
    }

    warp::reply::with_status(warp::reply::json(&err.to_response()), status)
}

fn ok_reply<T: serde::Serialize>(value: &T) -> WithStatus<Json> {
    warp::reply::with_status(warp::reply::json(value), StatusCode::OK)
}

async fn handle_record_guess(
    game_id: String,
    request: RecordGuessRequest,
    guess_service: Arc<GuessService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    match guess_service
        .record_guess(&game_id, &request.guess, &request.hiding_spot)
        .await
    {
        Ok(guess) => Ok(warp::reply::with_status(
            warp::reply::json(&guess),
            StatusCode::CREATED,
        )),
        Err(err) => Ok(error_reply(&game_id, &err)),
    }
}

async fn handle_list_guesses(
    game_id: String,
    guess_service: Arc<GuessService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    match guess_service.get_guesses(&game_id).await {
        Ok(guesses) => Ok(ok_reply(&guesses)),
        Err(err) => Ok(error_reply(&game_id, &err)),
    }
}

async fn handle_unique_guessers(
    game_id: String,
    guess_service: Arc<GuessService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    match guess_service.get_unique_guessers(&game_id).await {
        Ok(guessers) => Ok(ok_reply(&guessers)),
        Err(err) => Ok(error_reply(&game_id, &err)),
    }
}

async fn handle_latest_guess(
    game_id: String,
    user_id: String,
    guess_service: Arc<GuessService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    match guess_service.get_latest_guess(&game_id, &user_id).await {
        Ok(Some(guess)) => Ok(ok_reply(&guess)),
        Ok(None) => Ok(warp::reply::with_status(
            warp::reply::json(&ErrorResponse {
                code: ErrorCode::NotFound,
                message: format!("no guesses from user {user_id} in game {game_id}"),
            }),
            StatusCode::NOT_FOUND,
        )),
        Err(err) => Ok(error_reply(&game_id, &err)),
    }
}

async fn handle_statistics(
    game_id: String,
    guess_service: Arc<GuessService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    match guess_service.get_guess_statistics(&game_id).await {
        Ok(stats) => Ok(ok_reply(&stats)),
        Err(err) => Ok(error_reply(&game_id, &err)),
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use guess_core::{InMemoryStore, LedgerConfig, StatsRefresh};
    use guess_types::{GuessData, GuessStatistics, GuessSubmission, HidingSpot};

    fn create_test_app() -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone
    {
        let config = LedgerConfig {
            stats_refresh: StatsRefresh::Inline,
            ..LedgerConfig::default()
        };
        let store = Arc::new(InMemoryStore::new());
        create_routes(Arc::new(GuessService::new(store, config)))
    }

    fn guess_request(user_id: &str, object_key: &str, rel_x: f64, rel_y: f64) -> RecordGuessRequest {
        RecordGuessRequest {
            guess: GuessSubmission {
                user_id: user_id.to_string(),
                username: format!("{user_id}-name"),
                object_key: object_key.to_string(),
                rel_x,
                rel_y,
            },
            hiding_spot: HidingSpot {
                object_key: "pumpkin".to_string(),
                rel_x: 0.5,
                rel_y: 0.3,
            },
        }
    }

    async fn post_guess<F>(app: &F, game_id: &str, request: &RecordGuessRequest) -> GuessData
    where
        F: Filter + 'static,
        F::Extract: warp::Reply + Send,
    {
        let response = warp::test::request()
            .method("POST")
            .path(&format!("/games/{game_id}/guesses"))
            .json(request)
            .reply(app)
            .await;

        assert_eq!(response.status(), 201);
        serde_json::from_slice(response.body()).expect("Should be valid GuessData")
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_app();

        let response = warp::test::request()
            .method("GET")
            .path("/health")
            .reply(&app)
            .await;

        assert_eq!(response.status(), 200);
        assert_eq!(response.body(), "OK");
    }

    #[tokio::test]
    async fn test_record_guess_endpoint() {
        let app = create_test_app();

        let guess = post_guess(&app, "game-123", &guess_request("user-456", "pumpkin", 0.5, 0.3)).await;
        assert!(guess.is_correct);
        assert_eq!(guess.distance, 0.0);

        let guess = post_guess(&app, "game-123", &guess_request("user-456", "teddy", 0.7, 0.4)).await;
        assert!(!guess.is_correct);
        assert!(guess.distance > 0.0);
    }

    #[tokio::test]
    async fn test_request_body_uses_camel_case() {
        let app = create_test_app();

        let response = warp::test::request()
            .method("POST")
            .path("/games/game-1/guesses")
            .json(&serde_json::json!({
                "userId": "user-1",
                "username": "One",
                "objectKey": "teddy",
                "relX": 0.0,
                "relY": 0.3,
                "hidingSpot": { "objectKey": "pumpkin", "relX": 0.5, "relY": 0.3 }
            }))
            .reply(&app)
            .await;

        assert_eq!(response.status(), 201);
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["gameId"], "game-1");
        assert_eq!(body["distance"], 0.5);
    }

    #[tokio::test]
    async fn test_list_and_unique_guessers_endpoints() {
        let app = create_test_app();

        post_guess(&app, "game-1", &guess_request("user-1", "teddy", 0.1, 0.1)).await;
        let latest = post_guess(&app, "game-1", &guess_request("user-1", "pumpkin", 0.5, 0.3)).await;
        post_guess(&app, "game-1", &guess_request("user-2", "lamp", 0.9, 0.9)).await;

        let response = warp::test::request()
            .method("GET")
            .path("/games/game-1/guesses")
            .reply(&app)
            .await;
        assert_eq!(response.status(), 200);
        let guesses: Vec<GuessData> = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(guesses.len(), 3);
        assert_eq!(guesses[0].user_id, "user-2");

        let response = warp::test::request()
            .method("GET")
            .path("/games/game-1/guessers")
            .reply(&app)
            .await;
        let unique: Vec<GuessData> = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[1].timestamp, latest.timestamp);

        let response = warp::test::request()
            .method("GET")
            .path("/games/game-1/guessers/user-1/latest")
            .reply(&app)
            .await;
        assert_eq!(response.status(), 200);
        let found: GuessData = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(found, latest);

        let response = warp::test::request()
            .method("GET")
            .path("/games/game-1/guessers/nobody/latest")
            .reply(&app)
            .await;
        assert_eq!(response.status(), 404);
        let error: ErrorResponse = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(error.code, ErrorCode::NotFound);
        assert!(error.message.contains("nobody"));
    }

    #[tokio::test]
    async fn test_empty_game_lists_nothing() {
        let app = create_test_app();

        let response = warp::test::request()
            .method("GET")
            .path("/games/game-empty/guesses")
            .reply(&app)
            .await;

        assert_eq!(response.status(), 200);
        assert_eq!(response.body(), "[]");
    }

    #[tokio::test]
    async fn test_statistics_endpoint() {
        let app = create_test_app();

        post_guess(&app, "game-1", &guess_request("user-1", "pumpkin", 0.5, 0.3)).await;
        post_guess(&app, "game-1", &guess_request("user-2", "teddy", 0.0, 0.3)).await;

        let response = warp::test::request()
            .method("GET")
            .path("/games/game-1/stats")
            .reply(&app)
            .await;

        assert_eq!(response.status(), 200);
        let stats: GuessStatistics = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(
            stats,
            GuessStatistics {
                total_guesses: 2,
                correct_guesses: 1,
                unique_guessers: 2,
                average_distance: 0.25,
            }
        );
    }

    #[tokio::test]
    async fn test_invalid_game_id_is_bad_request() {
        let app = create_test_app();

        let response = warp::test::request()
            .method("GET")
            .path("/games/bad:id/stats")
            .reply(&app)
            .await;

        assert_eq!(response.status(), 400);
        let error: ErrorResponse = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(error.code, ErrorCode::InvalidIdentifier);
    }

    #[tokio::test]
    async fn test_invalid_payload_is_bad_request() {
        let app = create_test_app();

        let response = warp::test::request()
            .method("POST")
            .path("/games/game-1/guesses")
            .json(&guess_request("user-1", "teddy", 2.0, 0.5))
            .reply(&app)
            .await;

        assert_eq!(response.status(), 400);
        let error: ErrorResponse = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(error.code, ErrorCode::InvalidGuessPayload);
    }
}
