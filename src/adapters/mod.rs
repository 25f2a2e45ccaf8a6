// Adapters layer: concrete implementations of the domain ports (REST backend, local files).

pub mod http;
pub mod storage;

pub use http::{ApiClient, ClientSettings, Session};
pub use storage::LocalStorage;
