//! Cart line items and cart ownership.

use serde::{Deserialize, Serialize};

use super::{CartItemId, Product, ProductId, SessionKey, UserId};

/// The identity a cart is scoped to.
///
/// A cart belongs either to a signed-in user or to an anonymous browsing
/// session, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CartOwner {
    User(UserId),
    Anonymous(SessionKey),
}

impl CartOwner {
    /// The user ID, if this cart belongs to a signed-in user.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::User(id) => Some(*id),
            Self::Anonymous(_) => None,
        }
    }

    /// The anonymous session key, if this cart belongs to a guest.
    #[must_use]
    pub const fn session_key(&self) -> Option<SessionKey> {
        match self {
            Self::User(_) => None,
            Self::Anonymous(key) => Some(*key),
        }
    }
}

impl std::fmt::Display for CartOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{id}"),
            Self::Anonymous(key) => write!(f, "anon:{key}"),
        }
    }
}

/// One line of a cart.
///
/// `product` is the resolved catalog entry, or `None` when the lookup did not
/// resolve (for example, the product was removed after the row was added).
/// Unresolved lines are kept but contribute nothing to totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    /// Always at least 1; rows reaching zero are deleted.
    pub quantity: u32,
    pub product: Option<Product>,
}
