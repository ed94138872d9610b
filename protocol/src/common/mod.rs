pub mod auth;
pub mod ticket;

pub use auth::*;
pub use ticket::*;
