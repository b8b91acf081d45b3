//! Remote SDK testing service

mod client;

pub use client::{TestingServiceClient, TestingServiceError, SESSION_HEADER};
