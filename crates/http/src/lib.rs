//! CampusKart HTTP client
//!
//! Typed access to the CampusKart marketplace REST API with bearer-token
//! authentication and a one-shot refresh-and-retry on expired tokens.

#[macro_use]
extern crate tracing;

pub mod client;

pub use client::{
    AuthMode, CampusClient, CampusClientBuilder, ClientError, Collection, DEFAULT_BASE_URL,
    ListQuery, RequestBody, RequestOptions, Resource, RetryPolicy,
};
