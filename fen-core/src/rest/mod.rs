//! Signed REST plumbing for the futures API.

pub mod client;
pub mod signer;

pub use client::{Method, RestClient, RestResponse};
pub use signer::Params;
