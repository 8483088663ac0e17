pub mod handlers;
pub mod models;
pub mod server;

pub use models::{ErrorResponse, UploadResponse};
pub use server::{start_http_server, AppState};
