// Inventory: recipe-based destocking and low-stock alerts

pub mod models;
pub mod notifications;
pub mod repository;
pub mod service;

pub use models::*;
pub use notifications::*;
pub use repository::*;
pub use service::*;
