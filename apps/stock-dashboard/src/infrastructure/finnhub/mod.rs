//! Finnhub Quote Adapter
//!
//! REST implementation of `QuoteProviderPort` against Finnhub's
//! `/quote` endpoint.
//!
//! - **messages**: Wire format of the quote response
//! - **client**: HTTP client and error mapping

pub mod client;
pub mod messages;

pub use client::{FinnhubClient, FinnhubConfig, DEFAULT_BASE_URL};
pub use messages::FinnhubQuote;
