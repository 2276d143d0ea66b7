use crate::hand::{ErrorKind, HandError, HandView};
use crate::service::{HandService, ServiceError};
use axum::{
    async_trait,
    extract::{FromRequest, Path, Query, Request, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use prover::layout::HOLE_CARDS;
use prover::{Card, CardCommitment, ProofBytes, Seat, Seed, SeedCommitment, Street};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;
use uuid::Uuid;

use crate::archive::ArchivedHand;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<HandService>,
}

#[derive(Serialize, Deserialize)]
pub struct SeatRequest {
    pub seat: u64,
}

#[derive(Serialize, Deserialize)]
pub struct SeedCommitRequest {
    pub seat: u64,
    pub commitment: SeedCommitment,
}

#[derive(Serialize, Deserialize)]
pub struct SeedRevealRequest {
    pub seat: u64,
    pub seed: Seed,
}

#[derive(Serialize, Deserialize)]
pub struct HoleCardsRequest {
    pub seat: u64,
    pub commitments: [CardCommitment; HOLE_CARDS],
    pub proof: ProofBytes,
}

#[derive(Serialize, Deserialize)]
pub struct CommunityRequest {
    pub seat: u64,
    pub street: Street,
    pub cards: Vec<Card>,
    pub proof: ProofBytes,
}

#[derive(Serialize, Deserialize)]
pub struct ShowdownRequest {
    pub seat: u64,
    pub score: u64,
    pub proof: ProofBytes,
}

#[derive(Deserialize)]
pub struct ArchiveQuery {
    pub limit: Option<usize>,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: Option<ErrorKind>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

// Custom JSON extractor that returns 400 instead of 422 for JSON errors
pub struct CustomJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for CustomJson<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(CustomJson(value)),
            Err(_) => Err(StatusCode::BAD_REQUEST),
        }
    }
}

fn error_response(err: ServiceError) -> ApiError {
    let (status, kind) = match &err {
        ServiceError::HandNotFound(_) => (StatusCode::NOT_FOUND, None),
        ServiceError::Hand(HandError::UnknownSeat(_)) => {
            (StatusCode::BAD_REQUEST, Some(ErrorKind::Caller))
        }
        ServiceError::Hand(hand_err) => {
            let kind = hand_err.kind();
            let status = match kind {
                ErrorKind::Violation | ErrorKind::ProofRejection => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::Liveness | ErrorKind::Caller => StatusCode::CONFLICT,
            };
            (status, Some(kind))
        }
        ServiceError::ProofTimeout(_) => (StatusCode::GATEWAY_TIMEOUT, None),
        ServiceError::Oracle(_) | ServiceError::VerifierTask(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, None)
        }
    };

    if status.is_server_error() {
        warn!(error = %err, "Request failed");
    }
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            kind,
        }),
    )
}

fn seat(index: u64) -> Result<Seat, ApiError> {
    Seat::new(index).map_err(|e| error_response(HandError::from(e).into()))
}

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/v1/hands", post(create_hand))
        .route("/v1/hands/:id", get(get_hand))
        .route("/v1/hands/:id/bond", post(bond_seat))
        .route("/v1/hands/:id/start", post(start_hand))
        .route("/v1/hands/:id/seed-commit", post(commit_seed))
        .route("/v1/hands/:id/seed-reveal", post(reveal_seed))
        .route("/v1/hands/:id/hole-cards", post(submit_hole_cards))
        .route("/v1/hands/:id/community", post(reveal_community))
        .route("/v1/hands/:id/betting/close", post(close_betting_round))
        .route("/v1/hands/:id/fold", post(fold))
        .route("/v1/hands/:id/to-act", post(set_to_act))
        .route("/v1/hands/:id/showdown", post(reveal_hand))
        .route("/v1/archive", get(recent_hands))
        .layer(cors)
        .with_state(state)
}

pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn create_hand(State(state): State<AppState>) -> (StatusCode, Json<HandView>) {
    (StatusCode::CREATED, Json(state.service.create_hand()))
}

pub async fn get_hand(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<HandView> {
    state.service.hand_view(id).map(Json).map_err(error_response)
}

pub async fn bond_seat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    CustomJson(request): CustomJson<SeatRequest>,
) -> ApiResult<HandView> {
    let seat = seat(request.seat)?;
    state.service.bond_seat(id, seat).map(Json).map_err(error_response)
}

pub async fn start_hand(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<HandView> {
    state.service.start_hand(id).map(Json).map_err(error_response)
}

pub async fn commit_seed(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    CustomJson(request): CustomJson<SeedCommitRequest>,
) -> ApiResult<HandView> {
    let seat = seat(request.seat)?;
    state
        .service
        .commit_seed(id, seat, request.commitment)
        .map(Json)
        .map_err(error_response)
}

pub async fn reveal_seed(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    CustomJson(request): CustomJson<SeedRevealRequest>,
) -> ApiResult<HandView> {
    let seat = seat(request.seat)?;
    state
        .service
        .reveal_seed(id, seat, request.seed)
        .map(Json)
        .map_err(error_response)
}

pub async fn submit_hole_cards(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    CustomJson(request): CustomJson<HoleCardsRequest>,
) -> ApiResult<HandView> {
    let seat = seat(request.seat)?;
    state
        .service
        .submit_hole_cards(id, seat, request.commitments, request.proof)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn reveal_community(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    CustomJson(request): CustomJson<CommunityRequest>,
) -> ApiResult<HandView> {
    let seat = seat(request.seat)?;
    state
        .service
        .reveal_community(id, seat, request.street, request.cards, request.proof)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn close_betting_round(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<HandView> {
    state
        .service
        .close_betting_round(id)
        .map(Json)
        .map_err(error_response)
}

pub async fn fold(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    CustomJson(request): CustomJson<SeatRequest>,
) -> ApiResult<HandView> {
    let seat = seat(request.seat)?;
    state.service.fold(id, seat).map(Json).map_err(error_response)
}

pub async fn set_to_act(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    CustomJson(request): CustomJson<SeatRequest>,
) -> ApiResult<HandView> {
    let seat = seat(request.seat)?;
    state
        .service
        .set_to_act(id, seat)
        .map(Json)
        .map_err(error_response)
}

pub async fn reveal_hand(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    CustomJson(request): CustomJson<ShowdownRequest>,
) -> ApiResult<HandView> {
    let seat = seat(request.seat)?;
    state
        .service
        .reveal_hand(id, seat, request.score, request.proof)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn recent_hands(
    State(state): State<AppState>,
    Query(query): Query<ArchiveQuery>,
) -> Json<Vec<ArchivedHand>> {
    Json(state.service.archive().recent(query.limit.unwrap_or(50)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::events;
    use crate::hand::Stage;
    use axum::body::Body;
    use axum::http::Request;
    use prover::{NativeOracle, SeatClient};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tower::ServiceExt; // for `oneshot`

    fn setup_test_app() -> (Router, AppState) {
        let (events, _) = events::channel();
        let service = HandService::new(
            ServiceConfig::default(),
            Arc::new(NativeOracle::new()),
            events,
        );
        let state = AppState {
            service: Arc::new(service),
        };
        let app = create_app(state.clone());
        (app, state)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<String>) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let request = builder
            .body(body.map(Body::from).unwrap_or_else(Body::empty))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    async fn create(app: &Router) -> HandView {
        let (status, body) = send(app, "POST", "/v1/hands", None).await;
        assert_eq!(status, StatusCode::CREATED);
        serde_json::from_slice(&body).unwrap()
    }

    async fn start(app: &Router, id: Uuid) {
        for seat in 0..2u64 {
            let body = serde_json::to_string(&SeatRequest { seat }).unwrap();
            let (status, _) = send(app, "POST", &format!("/v1/hands/{id}/bond"), Some(body)).await;
            assert_eq!(status, StatusCode::OK);
        }
        let (status, _) = send(app, "POST", &format!("/v1/hands/{id}/start"), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_check() {
        let (app, _state) = setup_test_app();
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn test_create_and_get_hand() {
        let (app, _state) = setup_test_app();
        let created = create(&app).await;
        assert_eq!(created.stage, Stage::Waiting);

        let (status, body) = send(&app, "GET", &format!("/v1/hands/{}", created.id), None).await;
        assert_eq!(status, StatusCode::OK);
        let view: HandView = serde_json::from_slice(&body).unwrap();
        assert_eq!(view.id, created.id);

        let (status, _) = send(&app, "GET", &format!("/v1/hands/{}", Uuid::new_v4()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_json_is_bad_request() {
        let (app, _state) = setup_test_app();
        let id = create(&app).await.id;
        let (status, _) = send(
            &app,
            "POST",
            &format!("/v1/hands/{id}/bond"),
            Some("{\"seat\":".to_string()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_seat_changes_nothing() {
        let (app, state) = setup_test_app();
        let id = create(&app).await.id;
        let body = serde_json::to_string(&SeatRequest { seat: 5 }).unwrap();
        let (status, body) = send(&app, "POST", &format!("/v1/hands/{id}/bond"), Some(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(error.error.contains("Unknown seat"));
        let view = state.service.hand_view(id).unwrap();
        assert!(view.seats.iter().all(|s| !s.bonded));
    }

    #[tokio::test]
    async fn test_caller_error_is_conflict() {
        let (app, _state) = setup_test_app();
        let id = create(&app).await.id;
        let (status, body) = send(&app, "POST", &format!("/v1/hands/{id}/start"), None).await;

        assert_eq!(status, StatusCode::CONFLICT);
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.kind, Some(ErrorKind::Caller));
    }

    #[tokio::test]
    async fn test_seed_mismatch_aborts_over_http() {
        let (app, _state) = setup_test_app();
        let id = create(&app).await.id;
        start(&app, id).await;

        let mut rng = StdRng::seed_from_u64(21);
        let seats = [
            SeatClient::new(Seat::FIRST, &mut rng),
            SeatClient::new(Seat::SECOND, &mut rng),
        ];
        for client in &seats {
            let body = serde_json::to_string(&SeedCommitRequest {
                seat: client.seat().index() as u64,
                commitment: client.seed_commitment(),
            })
            .unwrap();
            let (status, _) =
                send(&app, "POST", &format!("/v1/hands/{id}/seed-commit"), Some(body)).await;
            assert_eq!(status, StatusCode::OK);
        }

        // Seat 1 reveals seat 0's seed
        let body = serde_json::to_string(&SeedRevealRequest {
            seat: 1,
            seed: seats[0].reveal_seed(),
        })
        .unwrap();
        let (status, body) =
            send(&app, "POST", &format!("/v1/hands/{id}/seed-reveal"), Some(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.kind, Some(ErrorKind::Violation));

        let (_, body) = send(&app, "GET", &format!("/v1/hands/{id}"), None).await;
        let view: HandView = serde_json::from_slice(&body).unwrap();
        assert_eq!(view.stage, Stage::Aborted);
        assert!(view.deck_seed.is_none());

        let (status, body) = send(&app, "GET", "/v1/archive?limit=5", None).await;
        assert_eq!(status, StatusCode::OK);
        let archived: Vec<ArchivedHand> = serde_json::from_slice(&body).unwrap();
        assert_eq!(archived.len(), 1);
    }

    #[tokio::test]
    async fn test_hole_cards_over_http() {
        let (app, state) = setup_test_app();
        let id = create(&app).await.id;
        start(&app, id).await;

        let mut rng = StdRng::seed_from_u64(22);
        let mut seats = [
            SeatClient::new(Seat::FIRST, &mut rng),
            SeatClient::new(Seat::SECOND, &mut rng),
        ];
        for client in &seats {
            state
                .service
                .commit_seed(id, client.seat(), client.seed_commitment())
                .unwrap();
        }
        for client in &seats {
            state
                .service
                .reveal_seed(id, client.seat(), client.reveal_seed())
                .unwrap();
        }
        let deck_seed = state.service.hand_view(id).unwrap().deck_seed.unwrap();

        let oracle = NativeOracle::new();
        for client in seats.iter_mut() {
            client.deal(&deck_seed, &mut rng);
            let submission = client.prove_hole_cards(&oracle, &deck_seed).unwrap();
            let body = serde_json::to_string(&HoleCardsRequest {
                seat: client.seat().index() as u64,
                commitments: submission.commitments,
                proof: submission.proof,
            })
            .unwrap();
            let (status, _) =
                send(&app, "POST", &format!("/v1/hands/{id}/hole-cards"), Some(body)).await;
            assert_eq!(status, StatusCode::OK);
        }

        let view = state.service.hand_view(id).unwrap();
        assert_eq!(view.stage, Stage::PreFlop);
        assert!(view.seats.iter().all(|s| s.cards_committed));
    }
}
