pub mod api;
pub mod models;
pub mod page;
pub mod time;
pub mod validate;
