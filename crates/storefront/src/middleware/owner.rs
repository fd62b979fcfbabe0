//! Cart and favorites owner resolution.
//!
//! A signed-in user owns their cart by user ID. Everyone else gets an
//! anonymous ID, minted on first access and kept in the session.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use chatcart_core::{CartOwner, SessionKey, UserId};

use crate::error::AppError;
use crate::models::session::keys;

/// Extractor for the visitor that owns the cart.
///
/// Requires the session layer.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(visitor: CurrentOwner) -> String {
///     visitor.owner.to_string()
/// }
/// ```
pub struct CurrentOwner {
    pub owner: CartOwner,
}

impl<S> FromRequestParts<S> for CurrentOwner
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;

        let owner = resolve_owner(&session).await?;
        sentry::configure_scope(|scope| scope.set_tag("cart_owner", owner));

        Ok(Self { owner })
    }
}

/// Resolve the owner for a session, minting an anonymous ID if needed.
///
/// # Errors
///
/// Returns an error if the session cannot be read or modified.
pub async fn resolve_owner(session: &Session) -> Result<CartOwner, tower_sessions::session::Error> {
    if let Some(user_id) = session.get::<UserId>(keys::CURRENT_USER).await? {
        return Ok(CartOwner::User(user_id));
    }

    if let Some(key) = session.get::<SessionKey>(keys::ANONYMOUS_ID).await? {
        return Ok(CartOwner::Anonymous(key));
    }

    let key = SessionKey::generate();
    session.insert(keys::ANONYMOUS_ID, key).await?;
    tracing::debug!(anonymous_id = %key, "minted anonymous visitor id");
    Ok(CartOwner::Anonymous(key))
}
