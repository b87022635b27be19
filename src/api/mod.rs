pub mod extract;
pub mod handlers;
pub mod routes;

pub use extract::AuthenticatedUser;
pub use routes::*;

use crate::{auth::AuthService, search::SearchService};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub search: Arc<SearchService>,
    pub auth: AuthService,
}

impl AppState {
    pub fn new(search: Arc<SearchService>, auth: AuthService) -> Self {
        Self { search, auth }
    }
}
