//! GraphQL gateway handler.
//!
//! Accepts a JSON operation request, runs it through an [`Executor`] and
//! answers with the JSON response envelope:
//!
//! ```text
//! Request:  {"query": "{ greeting }", "variables": {...}?, "operation": "Name"?}
//! Response: 200 OK, application/json, {"data": {...}, "errors": [...]?}
//! ```
//!
//! GraphQL errors (unknown fields, validation failures, resolver errors)
//! stay inside the envelope with status 200. A body that is not an
//! operation request is rejected with 400 before anything is executed.

pub mod executor;
pub mod handler;
pub mod request;

pub use executor::{Executor, SchemaExecutor};
pub use handler::handle_request;
