pub mod budget;
pub mod health;
pub mod onboard;

use axum::Router;

/// Routes mounted under `/api`.
///
/// ```text
/// POST /onboard    receive a completed onboarding form
/// GET  /budget     budget guidance for ?services=...&budget=...
/// ```
pub fn api_routes() -> Router {
    Router::new()
        .merge(onboard::router())
        .merge(budget::router())
}
