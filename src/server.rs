//! HTTP webhook server exposed to the voice-AI platform.
//!
//! Three POST routes: call init (assistant configuration) and the two tool
//! endpoints. Tool endpoints always answer 200 with prose — the voice
//! conversation must continue gracefully whatever happened underneath.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    response::IntoResponse,
    routing::{get, post},
};
use chrono_tz::Tz;
use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::db::ReservationStore;
use crate::error::ServerError;
use crate::prompt;
use crate::reservations::ReservationManager;
use crate::tools::{user_message, BookTableTool, ManageReservationTool, Tool, ToolError};
use crate::vapi::{AssistantResponse, ToolResult, WebhookPayload};

/// Maximum JSON body size for webhook requests (64 KB).
const MAX_BODY_BYTES: usize = 64 * 1024;

const RESTAURANT_NOT_FOUND: &str = "Erreur technique : restaurant introuvable.";
const TECHNICAL_ERROR: &str =
    "Désolé, une erreur technique est survenue, pouvez-vous réessayer dans un instant ?";

/// Shared state for all routes.
pub struct AppState {
    pub store: Arc<dyn ReservationStore>,
    pub tools: Vec<Arc<dyn Tool>>,
    /// Platform number assumed when the payload carries none (web test calls).
    pub fallback_number: Option<String>,
}

/// Wire the manager and tools around a store and return the shared state.
pub fn build_state(
    store: Arc<dyn ReservationStore>,
    timezone: Tz,
    fallback_number: Option<String>,
) -> Arc<AppState> {
    let manager = Arc::new(ReservationManager::new(store.clone(), timezone));
    let tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(BookTableTool::new(manager.clone())),
        Arc::new(ManageReservationTool::new(manager)),
    ];
    Arc::new(AppState {
        store,
        tools,
        fallback_number,
    })
}

/// Build the axum router with state applied.
pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/call/init", post(call_init_handler))
        .route("/tools/book_table", post(book_table_handler))
        .route("/tools/manage_reservation", post(manage_reservation_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    service: String,
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "maitred".to_string(),
    })
}

async fn call_init_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<WebhookPayload>,
) -> Json<AssistantResponse> {
    let Some(number) = called_number(&state, &payload) else {
        tracing::warn!("call init without a called number and no fallback configured");
        return Json(prompt::unknown_restaurant());
    };

    match state.store.find_restaurant_by_number(&number).await {
        Ok(Some(restaurant)) => {
            // A menu read failure degrades to an empty menu; the call itself
            // must still be answered.
            let menu = match state.store.list_available_menu_items(restaurant.id).await {
                Ok(menu) => menu,
                Err(err) => {
                    tracing::error!(error = %err, "menu lookup failed");
                    Vec::new()
                }
            };
            tracing::info!(restaurant = %restaurant.name, "call init");
            let schemas = state.tools.iter().map(|t| t.schema()).collect();
            Json(prompt::assistant_config(&restaurant, &menu, schemas))
        }
        Ok(None) => {
            tracing::warn!(%number, "no restaurant for called number");
            Json(prompt::unknown_restaurant())
        }
        Err(err) => {
            tracing::error!(error = %err, "restaurant lookup failed");
            Json(prompt::unknown_restaurant())
        }
    }
}

async fn book_table_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<WebhookPayload>,
) -> Json<ToolResult> {
    Json(run_tool(&state, "book_table", &payload).await)
}

async fn manage_reservation_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<WebhookPayload>,
) -> Json<ToolResult> {
    Json(run_tool(&state, "manage_reservation", &payload).await)
}

fn called_number(state: &AppState, payload: &WebhookPayload) -> Option<String> {
    payload.called_number().or_else(|| {
        state.fallback_number.as_ref().map(|number| {
            tracing::debug!("payload has no called number, assuming web test call");
            number.clone()
        })
    })
}

/// Resolve the restaurant owning the call, then dispatch to the named tool.
/// Every outcome is rendered as prose; the platform never sees an error
/// status.
async fn run_tool(state: &AppState, name: &str, payload: &WebhookPayload) -> ToolResult {
    let Some(tool) = state.tools.iter().find(|t| t.name() == name) else {
        tracing::error!(tool = name, "no such tool registered");
        return ToolResult {
            result: TECHNICAL_ERROR.to_string(),
        };
    };

    let Some(number) = called_number(state, payload) else {
        tracing::warn!(tool = name, "tool call without a called number");
        return ToolResult {
            result: RESTAURANT_NOT_FOUND.to_string(),
        };
    };

    let restaurant = match state.store.find_restaurant_by_number(&number).await {
        Ok(Some(restaurant)) => restaurant,
        Ok(None) => {
            tracing::warn!(%number, tool = name, "no restaurant for called number");
            return ToolResult {
                result: RESTAURANT_NOT_FOUND.to_string(),
            };
        }
        Err(err) => {
            tracing::error!(error = %err, tool = name, "restaurant lookup failed");
            return ToolResult {
                result: TECHNICAL_ERROR.to_string(),
            };
        }
    };

    let ctx = crate::tools::ToolContext {
        restaurant_id: restaurant.id,
        caller_number: payload.caller_number(),
    };

    match tool.execute(payload.tool_parameters(), &ctx).await {
        Ok(result) => ToolResult { result },
        Err(err) => {
            match &err {
                ToolError::Reservation(crate::reservations::ReservationError::Store(store_err)) => {
                    tracing::error!(error = %store_err, tool = name, "store failure during tool call");
                }
                other => {
                    tracing::debug!(error = %other, tool = name, "tool call rejected");
                }
            }
            ToolResult {
                result: user_message(&err),
            }
        }
    }
}

/// Single HTTP server hosting all webhook routes, with graceful shutdown.
pub struct WebhookServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl WebhookServer {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            shutdown_tx: None,
            handle: None,
        }
    }

    /// Bind the listener and spawn the server task.
    pub async fn start(&mut self, app: Router) -> Result<(), ServerError> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.addr,
                source,
            })?;

        tracing::info!("Webhook server listening on {}", self.addr);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                    tracing::info!("Webhook server shutting down");
                })
                .await
            {
                tracing::error!("Webhook server error: {}", e);
            }
        });

        self.handle = Some(handle);
        Ok(())
    }

    /// Signal graceful shutdown and wait for the server task to finish.
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::db::{MenuItem, Restaurant};
    use crate::reservations::{Reservation, ReservationStatus};
    use axum::body::Body;
    use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
    use chrono::{Duration, Utc};
    use http_body_util::BodyExt;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use tower::ServiceExt;
    use uuid::Uuid;

    const PLATFORM_NUMBER: &str = "+12406509923";
    const CALLER: &str = "+33612345678";

    fn luigi() -> Restaurant {
        Restaurant {
            id: Uuid::new_v4(),
            name: "Chez Luigi".to_string(),
            platform_number: PLATFORM_NUMBER.to_string(),
        }
    }

    fn seeded(store: &MemoryStore, restaurant_id: Uuid, name: &str, phone: &str) -> Uuid {
        let id = Uuid::new_v4();
        store.seed_reservation(Reservation {
            id,
            restaurant_id,
            customer_name: name.to_string(),
            customer_phone: Some(phone.to_string()),
            party_size: 2,
            reserved_at: Utc::now() + Duration::days(1),
            status: ReservationStatus::Confirmed,
            created_at: Utc::now(),
        });
        id
    }

    fn app(store: Arc<MemoryStore>) -> Router {
        let state = build_state(store, chrono_tz::Europe::Paris, None);
        routes(state)
    }

    async fn post(
        router: Router,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn tool_body(params: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "message": {
                "functionCall": { "name": "book_table", "parameters": params },
                "call": {
                    "phone_number": { "number": PLATFORM_NUMBER },
                    "customer": { "number": CALLER }
                }
            }
        })
    }

    #[tokio::test]
    async fn book_table_confirms_and_inserts() {
        let store = Arc::new(MemoryStore::with_restaurant(luigi()));
        let body = tool_body(serde_json::json!({
            "name": "Martin", "size": "4", "time_str": "demain à 20h"
        }));

        let (status, json) = post(app(store.clone()), "/tools/book_table", body).await;

        assert_eq!(status, StatusCode::OK);
        let result = json["result"].as_str().unwrap();
        assert!(result.contains("confirmée"), "got: {result}");
        assert!(result.contains("4 personnes"), "got: {result}");

        let stored = store.reservations.lock().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].customer_phone.as_deref(), Some(CALLER));
    }

    #[tokio::test]
    async fn unknown_called_number_is_reported_as_technical() {
        let store = Arc::new(MemoryStore::with_restaurant(luigi()));
        let mut body = tool_body(serde_json::json!({
            "name": "Martin", "size": 2, "time_str": "demain à 20h"
        }));
        body["message"]["call"]["phone_number"]["number"] =
            serde_json::Value::String("+10000000000".to_string());

        let (_, json) = post(app(store.clone()), "/tools/book_table", body).await;
        assert_eq!(json["result"], RESTAURANT_NOT_FOUND);
        assert!(store.reservations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn phoneless_call_without_backup_asks_for_a_number() {
        let store = Arc::new(MemoryStore::with_restaurant(luigi()));
        let mut body = tool_body(serde_json::json!({
            "name": "Martin", "size": 2, "time_str": "demain à 20h"
        }));
        body["message"]["call"]
            .as_object_mut()
            .unwrap()
            .remove("customer");

        let (_, json) = post(app(store.clone()), "/tools/book_table", body).await;
        let result = json["result"].as_str().unwrap();
        assert!(result.contains("numéro de téléphone"), "got: {result}");
        assert!(store.reservations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unresolvable_date_asks_to_repeat() {
        let store = Arc::new(MemoryStore::with_restaurant(luigi()));
        let body = tool_body(serde_json::json!({
            "name": "Martin", "size": 2, "time_str": "euh je sais pas"
        }));

        let (_, json) = post(app(store.clone()), "/tools/book_table", body).await;
        let result = json["result"].as_str().unwrap();
        assert!(result.contains("la date"), "got: {result}");
        assert!(store.reservations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn ambiguous_name_asks_for_phone() {
        let store = Arc::new(MemoryStore::with_restaurant(luigi()));
        let restaurant_id = store.restaurants[0].id;
        seeded(&store, restaurant_id, "Martin", CALLER);
        seeded(&store, restaurant_id, "Martine", "+33699999999");

        let body = serde_json::json!({
            "message": {
                "functionCall": {
                    "name": "manage_reservation",
                    "parameters": { "name": "Martin", "action": "cancel" }
                },
                "call": { "phone_number": { "number": PLATFORM_NUMBER } }
            }
        });

        let (_, json) = post(app(store.clone()), "/tools/manage_reservation", body).await;
        let result = json["result"].as_str().unwrap();
        assert!(result.contains("plusieurs réservations"), "got: {result}");

        // Nothing was cancelled.
        let stored = store.reservations.lock().unwrap();
        assert!(stored.iter().all(|r| r.status == ReservationStatus::Confirmed));
    }

    #[tokio::test]
    async fn cancel_flips_status() {
        let store = Arc::new(MemoryStore::with_restaurant(luigi()));
        let restaurant_id = store.restaurants[0].id;
        let id = seeded(&store, restaurant_id, "Martin", CALLER);

        let body = serde_json::json!({
            "message": {
                "functionCall": {
                    "name": "manage_reservation",
                    "parameters": { "name": "Martin", "action": "cancel" }
                },
                "call": { "phone_number": { "number": PLATFORM_NUMBER } }
            }
        });

        let (_, json) = post(app(store.clone()), "/tools/manage_reservation", body).await;
        assert!(json["result"].as_str().unwrap().contains("annulée"));

        let stored = store.reservations.lock().unwrap();
        let cancelled = stored.iter().find(|r| r.id == id).unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
    }

    #[tokio::test]
    async fn cancel_ignores_bookings_at_other_restaurants() {
        let mut store = MemoryStore::with_restaurant(luigi());
        let napoli = Restaurant {
            id: Uuid::new_v4(),
            name: "La Bella Napoli".to_string(),
            platform_number: "+12406509924".to_string(),
        };
        store.restaurants.push(napoli.clone());
        let store = Arc::new(store);

        // Martin's only booking lives at the other restaurant.
        let id = seeded(&store, napoli.id, "Martin", CALLER);

        let body = serde_json::json!({
            "message": {
                "functionCall": {
                    "name": "manage_reservation",
                    "parameters": { "name": "Martin", "action": "cancel" }
                },
                "call": { "phone_number": { "number": PLATFORM_NUMBER } }
            }
        });

        let (_, json) = post(app(store.clone()), "/tools/manage_reservation", body).await;
        let result = json["result"].as_str().unwrap();
        assert!(result.contains("aucune réservation"), "got: {result}");

        let stored = store.reservations.lock().unwrap();
        let foreign = stored.iter().find(|r| r.id == id).unwrap();
        assert_eq!(foreign.status, ReservationStatus::Confirmed);
    }

    #[tokio::test]
    async fn store_outage_yields_generic_prose_not_an_error_status() {
        let store = Arc::new(MemoryStore {
            failing: true,
            ..MemoryStore::with_restaurant(luigi())
        });
        let body = tool_body(serde_json::json!({
            "name": "Martin", "size": 2, "time_str": "demain à 20h"
        }));

        let (status, json) = post(app(store), "/tools/book_table", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["result"], TECHNICAL_ERROR);
    }

    #[tokio::test]
    async fn call_init_returns_prompt_and_tool_schemas() {
        let restaurant = luigi();
        let restaurant_id = restaurant.id;
        let mut store = MemoryStore::with_restaurant(restaurant);
        store.menu.push((
            restaurant_id,
            MenuItem {
                name: "Margherita".to_string(),
                price: Decimal::new(1250, 2),
            },
        ));

        let body = serde_json::json!({
            "message": { "phone_number": { "number": PLATFORM_NUMBER } }
        });

        let (status, json) = post(app(Arc::new(store)), "/call/init", body).await;
        assert_eq!(status, StatusCode::OK);

        let model = &json["assistant"]["model"];
        let prompt = model["systemPrompt"].as_str().unwrap();
        assert!(prompt.contains("Chez Luigi"));
        assert!(prompt.contains("Margherita"));

        let functions = model["functions"].as_array().unwrap();
        let names: Vec<_> = functions.iter().map(|f| f["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["book_table", "manage_reservation"]);
    }

    #[tokio::test]
    async fn call_init_for_unknown_number_apologizes() {
        let store = Arc::new(MemoryStore::default());
        let body = serde_json::json!({
            "message": { "phone_number": { "number": "+10000000000" } }
        });

        let (_, json) = post(app(store), "/call/init", body).await;
        let first_message = json["assistant"]["firstMessage"].as_str().unwrap();
        assert!(first_message.contains("je ne trouve pas le restaurant"));
    }

    #[tokio::test]
    async fn web_test_fallback_number_routes_the_call() {
        let store = Arc::new(MemoryStore::with_restaurant(luigi()));
        let state = build_state(
            store.clone(),
            chrono_tz::Europe::Paris,
            Some(PLATFORM_NUMBER.to_string()),
        );
        let router = routes(state);

        // No phone context at all, but the caller dictated a number.
        let body = serde_json::json!({
            "message": {
                "functionCall": {
                    "name": "book_table",
                    "parameters": {
                        "name": "Martin", "size": 2, "time_str": "demain à 20h",
                        "phone_backup": "+33611111111"
                    }
                }
            }
        });

        let (_, json) = post(router, "/tools/book_table", body).await;
        assert!(json["result"].as_str().unwrap().contains("confirmée"));

        let stored = store.reservations.lock().unwrap();
        assert_eq!(stored[0].customer_phone.as_deref(), Some("+33611111111"));
    }

    #[tokio::test]
    async fn health_endpoint_answers() {
        let store = Arc::new(MemoryStore::default());
        let request = Request::builder()
            .method("GET")
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app(store).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
