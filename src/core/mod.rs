pub mod aggregate;
pub mod debounce;
pub mod efetividade;
pub mod engine;
pub mod export;
pub mod filter;
pub mod form;
pub mod render;
pub mod sort;
pub mod view;

pub use crate::domain::model::{QueryParams, Record};
pub use crate::domain::ports::{Mutator, RecordSource, Storage};
pub use crate::utils::error::Result;
