//! Durable store client library.
//!
//! Speaks the PostgREST-style wire format of the external relational store:
//! filter query params, `Prefer` headers, JSON error bodies with a SQLSTATE
//! code.

pub mod rest;

pub use rest::StorageClient;
