//! Tasks: data model and the HTTP surface over them.

pub mod model;
pub mod routes;

pub use model::{Priority, Task};
pub use routes::{AppState, OwnerId, todo_routes};
