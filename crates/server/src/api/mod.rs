pub mod download;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod torznab;

pub use routes::create_router;
