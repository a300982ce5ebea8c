//! URL handling module for Classifieds-Harvest
//!
//! This module builds the search seed URL, resolves hrefs found in fetched
//! documents, and derives the JSON phone endpoint from a reveal control.

mod endpoints;
mod resolve;

pub use endpoints::{build_seed_url, phone_endpoint_url};
pub use resolve::{parse_base, resolve_href};
