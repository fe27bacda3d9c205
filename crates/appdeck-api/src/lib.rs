pub mod apps;
pub mod auth;
pub mod comments;
pub mod error;
pub mod middleware;
pub mod sweep;
pub mod upvotes;
