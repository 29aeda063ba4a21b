//! Echo handler.
//!
//! A stateless liveness endpoint: every request body is written to the log
//! and answered with the same plaintext greeting.
//!
//! ```text
//! Request:  <any method> <any path>\r\n\r\n<any body>
//! Response: 200 OK, body "Hello world"
//! ```

pub mod handler;

pub use handler::handle_request;
