pub mod api;
pub mod auth;
pub mod health;
pub mod inbox;

pub use api::create_api_routes;
pub use auth::create_auth_routes;
pub use health::create_health_routes;
pub use inbox::create_inbox_routes;
