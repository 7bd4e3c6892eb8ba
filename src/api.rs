// 🌐 REST API - Axum router over one shared ledger
// Each request holds the ledger lock for a single synchronous operation

use crate::aggregate::{self, CategorySummary, Totals};
use crate::db::KeyValueStore;
use crate::filter::{Filter, TypeFilter};
use crate::parser::{self, StatementReader};
use crate::state::Ledger;
use crate::transaction::Transaction;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info, warn};

/// Shared application state
pub struct AppState<S: KeyValueStore> {
    ledger: Arc<Mutex<Ledger<S>>>,
    reader: Arc<StatementReader>,
}

impl<S: KeyValueStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        AppState {
            ledger: Arc::clone(&self.ledger),
            reader: Arc::clone(&self.reader),
        }
    }
}

impl<S: KeyValueStore> AppState<S> {
    pub fn new(ledger: Ledger<S>, reader: StatementReader) -> Self {
        AppState {
            ledger: Arc::new(Mutex::new(ledger)),
            reader: Arc::new(reader),
        }
    }

    fn ledger(&self) -> Result<MutexGuard<'_, Ledger<S>>, Response> {
        self.ledger.lock().map_err(|_| {
            error!("Ledger lock poisoned");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "ledger unavailable")
        })
    }
}

/// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ApiResponse {
        success: false,
        data: (),
        error: Some(message.into()),
    };
    (status, Json(body)).into_response()
}

// ============================================================================
// Request / response shapes
// ============================================================================

/// Filter fields as query parameters; `category` is a comma-separated list.
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub search: Option<String>,
}

impl FilterQuery {
    pub fn into_filter(self) -> Result<Filter, String> {
        if self.min.is_some_and(|v| !v.is_finite()) {
            return Err("min must be a finite number".to_string());
        }
        if self.max.is_some_and(|v| !v.is_finite()) {
            return Err("max must be a finite number".to_string());
        }

        let mut filter = Filter::new().with_amount_range(self.min, self.max);

        if let Some(from) = non_blank(self.from) {
            let date = parser::parse_date(&from).ok_or_else(|| format!("invalid from date {from:?}"))?;
            filter = filter.from_date(date);
        }
        if let Some(to) = non_blank(self.to) {
            let date = parser::parse_date(&to).ok_or_else(|| format!("invalid to date {to:?}"))?;
            filter = filter.to_date(date);
        }
        if let Some(categories) = self.category {
            for category in categories.split(',').map(str::trim).filter(|c| !c.is_empty()) {
                filter = filter.with_category(category);
            }
        }
        if let Some(kind) = non_blank(self.kind) {
            filter = filter.with_kind(kind.parse::<TypeFilter>()?);
        }
        if let Some(search) = non_blank(self.search) {
            filter = filter.with_search(&search);
        }

        Ok(filter)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub totals: Totals,
    pub categories: Vec<CategorySummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RejectedRowResponse {
    pub index: usize,
    pub line: Option<u64>,
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportResponse {
    pub accepted: usize,
    pub rejected: Vec<RejectedRowResponse>,
    pub saved: bool,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/transactions - Transactions passing the query filter
async fn get_transactions<S: KeyValueStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<FilterQuery>,
) -> Response {
    let filter = match query.into_filter() {
        Ok(filter) => filter,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };
    let ledger = match state.ledger() {
        Ok(ledger) => ledger,
        Err(response) => return response,
    };

    let transactions: Vec<Transaction> = filter.apply(ledger.transactions());
    (StatusCode::OK, Json(ApiResponse::ok(transactions))).into_response()
}

/// GET /api/summary - Totals and per-category rows for the query filter
async fn get_summary<S: KeyValueStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<FilterQuery>,
) -> Response {
    let filter = match query.into_filter() {
        Ok(filter) => filter,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };
    let ledger = match state.ledger() {
        Ok(ledger) => ledger,
        Err(response) => return response,
    };

    let filtered = filter.apply(ledger.transactions());
    let summary = SummaryResponse {
        totals: aggregate::totals(&filtered),
        categories: aggregate::totals_by_category(&filtered),
    };

    (StatusCode::OK, Json(ApiResponse::ok(summary))).into_response()
}

/// GET /api/categories - Categories present in the collection
async fn get_categories<S: KeyValueStore>(State(state): State<AppState<S>>) -> Response {
    match state.ledger() {
        Ok(ledger) => {
            let categories = ledger.available_categories();
            (StatusCode::OK, Json(ApiResponse::ok(categories))).into_response()
        }
        Err(response) => response,
    }
}

/// POST /api/import - Replace the collection with a CSV statement
async fn import_statement<S: KeyValueStore>(
    State(state): State<AppState<S>>,
    body: String,
) -> Response {
    let rows = match state.reader.read(body.as_bytes()) {
        Ok(rows) => rows,
        Err(err) => {
            warn!(error = %format!("{err:#}"), "Rejected statement upload");
            return error_response(StatusCode::BAD_REQUEST, format!("{err:#}"));
        }
    };

    let mut ledger = match state.ledger() {
        Ok(ledger) => ledger,
        Err(response) => return response,
    };

    let outcome = ledger.ingest(rows);
    info!(accepted = outcome.accepted, "Imported statement over HTTP");

    let response = ImportResponse {
        accepted: outcome.accepted,
        rejected: outcome
            .rejected
            .into_iter()
            .map(|row| RejectedRowResponse {
                index: row.index,
                line: row.line,
                error: row.error.to_string(),
            })
            .collect(),
        saved: outcome.saved,
    };

    (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
}

/// DELETE /api/transactions - Empty the collection
async fn clear_transactions<S: KeyValueStore>(State(state): State<AppState<S>>) -> Response {
    match state.ledger() {
        Ok(mut ledger) => {
            let saved = ledger.clear();
            (StatusCode::OK, Json(ApiResponse::ok(saved))).into_response()
        }
        Err(response) => response,
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn create_router<S>(state: AppState<S>) -> Router
where
    S: KeyValueStore + Send + 'static,
{
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route(
            "/transactions",
            get(get_transactions::<S>).delete(clear_transactions::<S>),
        )
        .route("/summary", get(get_summary::<S>))
        .route("/categories", get(get_categories::<S>))
        .route("/import", post(import_statement::<S>))
        .with_state(state);

    Router::new().nest("/api", api_routes)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use crate::db::MemoryStore;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const STATEMENT: &str = "Data Movimento;Descrição;Montante;Saldo\n\
        01/08/2025;PINGO DOCE LISBOA;-45,50;954,50\n\
        02/08/2025;LIDL PORTO;-20,00;934,50\n\
        03/08/2025;UNKNOWN MERCHANT XYZ;12,00;946,50\n\
        04/08/2025;REPSOL A1;-60,00;886,50\n\
        05/08/2025;BROKEN ROW;abc;886,50\n";

    fn setup_test_app() -> Router {
        let ledger = Ledger::open(MemoryStore::new(), Classifier::with_defaults().unwrap());
        create_router(AppState::new(ledger, StatementReader::default()))
    }

    async fn get_body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn import(app: &Router) -> serde_json::Value {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/import")
                    .body(Body::from(STATEMENT))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        get_body_json(response).await
    }

    #[tokio::test]
    async fn test_health() {
        let app = setup_test_app();
        let response = app.oneshot(get_request("/api/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = get_body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], "OK");
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn test_import_then_list() {
        let app = setup_test_app();

        let json = import(&app).await;
        assert_eq!(json["data"]["accepted"], 4);
        assert_eq!(json["data"]["saved"], true);
        assert_eq!(json["data"]["rejected"][0]["index"], 5);
        assert_eq!(json["data"]["rejected"][0]["line"], 6);

        let response = app.oneshot(get_request("/api/transactions")).await.unwrap();
        let json = get_body_json(response).await;
        let rows = json["data"].as_array().unwrap();

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0]["entity"], "Supermercado Pingo Doce");
        assert_eq!(rows[0]["type"], "debit");
        assert_eq!(rows[2]["category"], "🅾️ Outros");
    }

    #[tokio::test]
    async fn test_transactions_query_filter() {
        let app = setup_test_app();
        import(&app).await;

        let response = app
            .clone()
            .oneshot(get_request("/api/transactions?type=credit"))
            .await
            .unwrap();
        let json = get_body_json(response).await;
        assert_eq!(json["data"].as_array().unwrap().len(), 1);

        let response = app
            .oneshot(get_request("/api/transactions?from=02/08/2025&to=2025-08-03&search=lidl"))
            .await
            .unwrap();
        let json = get_body_json(response).await;
        let rows = json["data"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["description"], "LIDL PORTO");
    }

    #[tokio::test]
    async fn test_bad_filter_is_bad_request() {
        let app = setup_test_app();
        let response = app
            .oneshot(get_request("/api/transactions?type=sideways"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = get_body_json(response).await;
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().contains("sideways"));
    }

    #[tokio::test]
    async fn test_non_finite_amount_bound_is_bad_request() {
        let app = setup_test_app();
        import(&app).await;

        for uri in ["/api/transactions?min=NaN", "/api/summary?max=inf"] {
            let response = app.clone().oneshot(get_request(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);

            let json = get_body_json(response).await;
            assert!(json["error"].as_str().unwrap().contains("finite"));
        }
    }

    #[tokio::test]
    async fn test_summary() {
        let app = setup_test_app();
        import(&app).await;

        let response = app.oneshot(get_request("/api/summary?type=debit")).await.unwrap();
        let json = get_body_json(response).await;
        let data = &json["data"];

        assert_eq!(data["totals"]["count"], 3);
        assert_eq!(data["totals"]["debits"], 125.5);

        let categories = data["categories"].as_array().unwrap();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0]["category"], "🛒 Supermercados / Mantimentos");
        assert_eq!(categories[0]["total"], -65.5);
    }

    #[tokio::test]
    async fn test_categories_and_clear() {
        let app = setup_test_app();
        import(&app).await;

        let response = app.clone().oneshot(get_request("/api/categories")).await.unwrap();
        let json = get_body_json(response).await;
        assert_eq!(json["data"].as_array().unwrap().len(), 3);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/transactions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(get_request("/api/transactions")).await.unwrap();
        let json = get_body_json(response).await;
        assert!(json["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_import_without_required_columns() {
        let app = setup_test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/import")
                    .body(Body::from("a,b\n1,2\n"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = get_body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("Missing column"));
    }

    #[test]
    fn test_filter_query_category_list() {
        let query = FilterQuery {
            category: Some("food, fuel,,".to_string()),
            ..FilterQuery::default()
        };
        let filter = query.into_filter().unwrap();

        assert_eq!(filter.categories.len(), 2);
        assert!(filter.categories.contains("fuel"));
    }
}
