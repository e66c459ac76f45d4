mod auth;
mod external;

pub use auth::EXPIRY_LEEWAY_SECS;
pub use auth::Lookup;
pub use auth::TokenStore;
pub use auth::is_expired;
pub use external::ApiSettings;
pub use external::ExternalApi;
pub use external::ExternalApiState;
pub use external::Phase;
