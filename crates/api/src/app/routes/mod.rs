use axum::Router;

pub mod invoices;
pub mod matching;
pub mod obligations;
pub mod recurring;
pub mod statements;
pub mod system;

/// Router for every business endpoint.
pub fn router() -> Router {
    Router::new()
        .nest("/obligations", obligations::router())
        .nest("/invoices", invoices::router())
        .nest("/recurring", recurring::router())
        .nest("/matching", matching::router())
        .nest("/statements", statements::router())
}
