//! Cart state for one owner.
//!
//! The database is the system of record. [`CartSynchronizer`] keeps a local
//! copy of one owner's lines for rendering and follows a fixed protocol for
//! every mutation:
//!
//! 1. apply a local patch (skipped for adds, which may merge into an existing line)
//! 2. await the [`CartStore`] call
//! 3. refetch and replace the local copy, whether step 2 succeeded or not
//!
//! A failed store call is returned to the caller only after the refetch, so
//! the local copy never ends on a half-applied patch.

mod store;
mod synchronizer;

pub use store::{CartError, CartStore};
pub use synchronizer::CartSynchronizer;
