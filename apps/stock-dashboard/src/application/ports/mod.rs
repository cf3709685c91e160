//! Application Ports (Driven)
//!
//! Interfaces to the external collaborators. Infrastructure adapters
//! implement them; tests substitute fakes and mocks.
//!
//! - `QuoteProviderPort`: get the current quote for a symbol
//! - `QuoteWriterPort` / `QuoteReaderPort`: append-only time-series store
//! - `ChartSinkPort`: rendering layer fed by the refresh loop

mod chart_sink_port;
mod quote_provider_port;
mod quote_store_port;

pub use chart_sink_port::{ChartFrame, ChartSinkPort};
pub use quote_provider_port::{FetchError, QuoteProviderPort};
pub use quote_store_port::{QueryError, QuoteReaderPort, QuoteWriterPort, WriteError};

#[cfg(test)]
pub use quote_provider_port::MockQuoteProviderPort;
#[cfg(test)]
pub use quote_store_port::{MockQuoteReaderPort, MockQuoteWriterPort};
