//! Procurement Buyer Library
//!
//! Buyer-side procurement workflows: fetching purchase orders and vendor-split
//! PO children, classifying them into workflow buckets, aggregating dashboard
//! statistics, and driving price negotiation, store routing and vendor
//! selection against the procurement backend.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod client;
pub mod config;
pub mod errors;
pub mod events;
pub mod models;
pub mod services;

pub use client::{HttpProcurementApi, ProcurementApi, Session};
pub use config::AppConfig;
pub use errors::ServiceError;
pub use services::BuyerWorkspace;
