//! Operation request parsing.

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// A single GraphQL operation submitted over HTTP.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OperationRequest {
    /// GraphQL document text.
    pub query: String,
    /// Variable values by name.
    #[serde(default)]
    pub variables: Option<Map<String, Value>>,
    /// Operation to run when the document defines several.
    #[serde(default, alias = "operationName")]
    pub operation: Option<String>,
}

/// Why a body could not be read as an operation request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Invalid operation request: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl OperationRequest {
    /// Parse a request body.
    ///
    /// The body must be a JSON object with a string `query`. `variables`
    /// must be an object and `operation` a string when present; a `null`
    /// for either counts as absent. Unknown keys are ignored.
    pub fn from_slice(body: &[u8]) -> Result<Self, RequestError> {
        Ok(serde_json::from_slice(body)?)
    }
}

#[cfg(test)]
impl OperationRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: None,
            operation: None,
        }
    }

    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }
}

impl From<OperationRequest> for async_graphql::Request {
    fn from(request: OperationRequest) -> Self {
        let mut converted = async_graphql::Request::new(request.query);
        if let Some(variables) = request.variables {
            converted = converted
                .variables(async_graphql::Variables::from_json(Value::Object(variables)));
        }
        if let Some(operation) = request.operation {
            converted = converted.operation_name(operation);
        }
        converted
    }
}
