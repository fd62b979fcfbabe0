//! WhatsApp checkout handlers.

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::instrument;

use crate::cart::CartSynchronizer;
use crate::checkout::{build_order_message, whatsapp_url};
use crate::error::Result;
use crate::middleware::CurrentOwner;
use crate::state::AppState;

/// Order message and the link that sends it.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutView {
    pub message: String,
    pub url: String,
}

async fn checkout_link(state: &AppState, visitor: &CurrentOwner) -> Result<CheckoutView> {
    let cart = CartSynchronizer::load(state.cart_store(), visitor.owner).await?;
    let config = state.config();

    let message = build_order_message(&config.store_name, &cart.items())?;
    let url = whatsapp_url(&config.whatsapp_phone, &message)?;
    Ok(CheckoutView { message, url })
}

/// Return the order message and WhatsApp link.
#[instrument(skip(state, visitor), fields(owner = %visitor.owner))]
pub async fn show(State(state): State<AppState>, visitor: CurrentOwner) -> Result<Json<CheckoutView>> {
    Ok(Json(checkout_link(&state, &visitor).await?))
}

/// Redirect to WhatsApp with the order message prefilled.
#[instrument(skip(state, visitor), fields(owner = %visitor.owner))]
pub async fn redirect(State(state): State<AppState>, visitor: CurrentOwner) -> Result<Response> {
    let view = checkout_link(&state, &visitor).await?;
    tracing::info!("redirecting to WhatsApp checkout");
    Ok((StatusCode::FOUND, [(header::LOCATION, view.url)]).into_response())
}
