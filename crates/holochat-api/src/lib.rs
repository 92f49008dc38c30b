pub mod auth;
pub mod contacts;
pub mod error;
pub mod extract;
pub mod mail;
pub mod middleware;
pub mod nickname;
pub mod pages;
pub mod password;
pub mod validation;
pub mod verification;
pub mod weather;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tracing::error;

use holochat_db::Database;

use crate::error::ApiError;
use crate::mail::Mailer;
use crate::middleware::require_auth;
use crate::weather::WeatherClient;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub mailer: Arc<dyn Mailer>,
    pub weather: WeatherClient,
}

/// Build the full HTTP surface. Logging and CORS layers are added by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(pages::index))
        .route("/auth", post(auth::register).get(auth::sign_in))
        .route("/service", get(verification::verify_email))
        .route("/service/success", get(pages::verification_success))
        .route(
            "/changePassword",
            get(password::send_reset_code).post(password::update_password),
        )
        .route("/changeNickname", post(nickname::update_nickname))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route(
            "/contacts",
            get(contacts::list_contacts).post(contacts::add_or_accept_contact),
        )
        .route("/contacts/search", get(contacts::search))
        .route("/contacts/search/{email}", get(contacts::search_by_email))
        .route("/contacts/all", get(contacts::list_all_members))
        .route("/contacts/chatlist", get(contacts::list_chats))
        .route("/contacts/chats", get(contacts::list_chat_members))
        .route("/contacts/getNonFriends/{memberid}", get(contacts::list_non_friends))
        .route("/contacts/contact/{member_id}", get(contacts::get_contact))
        .route(
            "/contacts/{memberid_b}",
            post(contacts::add_contact).delete(contacts::remove_contact),
        )
        .route("/weather", get(weather::missing_location))
        .route("/weather/{location}", get(weather::get_weather))
        .layer(axum::middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

/// Run a store call on the blocking pool. Store failures surface as
/// [`ApiError::Database`].
pub(crate) async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })?
        .map_err(ApiError::Database)
}
