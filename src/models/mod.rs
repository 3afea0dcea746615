//! Request-scoped data for the connector.
//!
//! Nothing in here outlives a single request: a [`request::RequestData`] is
//! built once per inbound request and a [`entry::StorageEntry`] list is built
//! once per folder listing.

pub mod entry;
pub mod request;
