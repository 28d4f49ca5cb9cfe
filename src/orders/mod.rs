pub mod effects;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

pub use effects::*;
pub use error::*;
pub use handlers::*;
pub use models::*;
pub use repository::*;
pub use service::*;
