//! Core services: request decoding, identity parsing, path translation and
//! the per-request backend session.

pub mod backend_session;
pub mod connector_service;
pub mod identity;
pub mod path_translator;
pub mod registry;
pub mod request_decoder;
