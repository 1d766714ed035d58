pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod stream;
pub mod upload;

pub use error::ApiError;
pub use routes::create_router;
pub use stream::{stream_file, StreamError};
