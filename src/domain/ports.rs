use crate::domain::model::{QueryParams, Record};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Read side of the REST backend.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_records(&self, resource: &str, params: &QueryParams) -> Result<Vec<Record>>;
}

/// Write side of the REST backend. Implementations attach the CSRF token.
#[async_trait]
pub trait Mutator: Send + Sync {
    async fn submit(&self, resource: &str, payload: &serde_json::Value) -> Result<serde_json::Value>;
}
