//! LevelUp REST API: wire types and the typed client.

pub mod client;
pub mod model;

pub use client::ApiClient;
pub use model::{Category, CategoryRequest, GenericResponse, Stat, StatRequest, Task, TaskRequest};
