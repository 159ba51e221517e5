//! Application router configuration.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::{
    AppState, endpoints,
    internal_server_error::get_internal_server_error_page,
    not_found::get_404_not_found,
    page::{get_index_page, submit_transaction_form},
    transaction::{
        create_transaction_endpoint, create_transactions_bulk_endpoint, get_transactions_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let page_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::TRANSACTION_FORM, post(submit_transaction_form))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let api_routes = Router::new()
        .route(
            endpoints::TRANSACTION_API,
            get(get_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION_BULK_API,
            post(create_transactions_bulk_endpoint),
        );

    page_routes
        .merge(api_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::{AppState, endpoints};

    use super::build_router;

    fn get_test_server() -> TestServer {
        let conn = Connection::open_in_memory().unwrap();
        let state = AppState::new(conn).unwrap();

        TestServer::try_new(build_router(state)).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn root_serves_budget_page() {
        let server = get_test_server();

        let response = server.get(endpoints::ROOT).await;

        response.assert_status_ok();
        assert!(response.text().contains("Your total is: $"));
    }

    #[tokio::test]
    async fn api_round_trip_through_router() {
        let server = get_test_server();

        server
            .post(endpoints::TRANSACTION_API)
            .json(&json!({ "name": "Salary", "value": 1000 }))
            .await
            .assert_status_ok();
        server
            .post(endpoints::TRANSACTION_BULK_API)
            .json(&json!([{ "name": "Groceries", "value": -50 }]))
            .await
            .assert_status_ok();

        let transactions: Vec<Value> = server.get(endpoints::TRANSACTION_API).await.json();

        assert_eq!(transactions.len(), 2);
    }

    #[tokio::test]
    async fn page_renders_after_largest_amounts_are_stored() {
        let server = get_test_server();
        for _ in 0..2 {
            server
                .post(endpoints::TRANSACTION_API)
                .json(&json!({ "name": "big", "value": "9223372036854775807" }))
                .await
                .assert_status_ok();
        }

        let response = server.get(endpoints::ROOT).await;

        response.assert_status_ok();
        assert!(response.text().contains("18446744073709551614"));
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let server = get_test_server();

        let response = server.get("/does-not-exist").await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn error_view_is_internal_server_error() {
        let server = get_test_server();

        let response = server.get(endpoints::INTERNAL_ERROR_VIEW).await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    }
}
