//! Execution capability behind the gateway handler.

use async_graphql::dynamic::Schema;
use async_trait::async_trait;
use tracing::trace;

use super::request::OperationRequest;

/// The standard GraphQL response envelope (`data`, optional `errors`).
pub type ExecutionResult = async_graphql::Response;

/// Runs operation requests against a schema.
///
/// GraphQL-level failures are reported inside the returned envelope, never
/// as an `Err`, so implementations are infallible.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, request: OperationRequest) -> ExecutionResult;
}

/// Executes requests against a schema built once at startup.
pub struct SchemaExecutor {
    schema: Schema,
}

impl SchemaExecutor {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }
}

#[async_trait]
impl Executor for SchemaExecutor {
    async fn execute(&self, request: OperationRequest) -> ExecutionResult {
        let response = self
            .schema
            .execute(async_graphql::Request::from(request))
            .await;
        trace!(errors = response.errors.len(), "Operation executed");
        response
    }
}
