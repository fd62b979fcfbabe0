//! Session-related types.
//!
//! Identity stored in the session. A visitor either has a signed-in user or
//! an anonymous ID minted on first cart or favorites access.

/// Session keys.
pub mod keys {
    /// Key for the signed-in user's ID (`UserId`).
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the anonymous visitor ID (`SessionKey`), created on first use.
    pub const ANONYMOUS_ID: &str = "anonymous_id";
}
