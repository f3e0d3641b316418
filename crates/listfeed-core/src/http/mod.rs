//! HTTP surface: `/feed.xml` and a liveness probe on `/`.

mod routes;
mod server;

pub use routes::build_router;
pub use server::FeedServer;
