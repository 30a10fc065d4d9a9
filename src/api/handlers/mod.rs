//! HTTP request handlers for the demo endpoints.
//!
//! Each handler module corresponds to a logical grouping of endpoints.

pub mod echo;
pub mod health;
pub mod index;
pub mod panic;
pub mod users;

pub use echo::echo_handler;
pub use health::health_handler;
pub use index::index_handler;
pub use panic::panic_handler;
pub use users::user_handler;
