//! Saved and dashboard searches
//!
//! Searches are stored per user as serialized query descriptions. Dashboard
//! searches carry a sliding modification window advanced by [`advance_window`].

pub mod manager;
pub mod types;
pub mod window;

pub use manager::SavedSearchManager;
pub use types::{CreateSavedSearchRequest, SavedSearch, UpdateSavedSearchRequest, VisitedNode};
pub use window::advance_window;
