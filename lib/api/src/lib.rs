//! # BlendX API
//!
//! HTTP surface of the recommender, served with actix-web.

pub mod rest;

pub use rest::RestApi;
