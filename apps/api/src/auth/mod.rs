// Account collaborator for the analyzer: signup, login, bearer-session checks.
// Storage is injected through `UserStore`; the default store lives in memory only.

pub mod extractor;
pub mod handlers;
pub mod password;
pub mod sessions;
pub mod store;

pub use extractor::AuthUser;
pub use sessions::SessionStore;
pub use store::{InMemoryUserStore, UserStore};

/// Canonical form used for lookups: trimmed, lowercase.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
