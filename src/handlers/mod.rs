//! Request handlers.
//!
//! Each handler answers every request the server receives; the active one
//! is picked at startup and mounted as the router's fallback.
//!
//! - `echo`: logs the body, replies with a fixed greeting
//! - `graphql`: executes the body as a GraphQL operation request

pub mod echo;
pub mod graphql;
