//! The API endpoints URIs.

/// The page showing the total, transaction table and chart.
pub const ROOT: &str = "/";
/// The route the page's add/subtract form posts to.
pub const TRANSACTION_FORM: &str = "/transaction";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The route to list and create transactions.
pub const TRANSACTION_API: &str = "/api/transaction";
/// The route to create many transactions at once.
pub const TRANSACTION_BULK_API: &str = "/api/transaction/bulk";

// These tests are here so that we know when we call `Uri::from_shared` it will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok());
    }

    #[test]
    fn endpoints_are_valid_uris() {
        assert_endpoint_is_valid_uri(endpoints::ROOT);
        assert_endpoint_is_valid_uri(endpoints::TRANSACTION_FORM);
        assert_endpoint_is_valid_uri(endpoints::INTERNAL_ERROR_VIEW);
        assert_endpoint_is_valid_uri(endpoints::STATIC);
        assert_endpoint_is_valid_uri(endpoints::TRANSACTION_API);
        assert_endpoint_is_valid_uri(endpoints::TRANSACTION_BULK_API);
    }

    #[test]
    fn api_routes_are_intercepted_as_data_requests() {
        // The client's caching layer treats any path containing "/api/" as data.
        assert!(endpoints::TRANSACTION_API.contains("/api/"));
        assert!(endpoints::TRANSACTION_BULK_API.contains("/api/"));
        assert!(!endpoints::STATIC.contains("/api/"));
    }
}
