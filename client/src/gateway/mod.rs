//! Request execution against the backend.
//!
//! [`ApiClient`] attaches the session's bearer token, encodes JSON or
//! multipart bodies, and folds every outcome (transport failure, bad JSON,
//! `success: false`) into an [`crate::error::ApiResult`]. The HTTP hop is
//! behind the [`Transport`] trait.

pub mod client;
pub mod multipart;
pub mod transport;

pub use self::client::{ApiClient, Body, normalize};
pub use self::multipart::{Multipart, Upload};
pub use self::transport::{HyperTransport, RawResponse, Transport};
