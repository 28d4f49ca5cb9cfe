// Coupon validation and usage accounting

pub mod models;
pub mod repository;
pub mod service;

pub use models::*;
pub use repository::*;
pub use service::*;
