//! Incremental job-listing browser: paginated fetch-and-append, multi-field
//! filtering and infinite-scroll paging over a single listing endpoint.

pub mod config;
pub mod fetch;
pub mod filter;
pub mod logging;
pub mod models;
pub mod scroll;
pub mod session;
pub mod store;
pub mod tui;

pub use config::Config;
pub use fetch::{FetchError, HttpListingSource, ListingPage, ListingSource, PageRequest};
pub use filter::{FilterCriteria, FilterField, apply_filters};
pub use models::ListingRecord;
pub use scroll::{ScrollMetrics, ScrollTrigger};
pub use session::Session;
pub use store::{Effect, Overlay, StoreEvent, StoreState};
