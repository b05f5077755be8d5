//! Native-messaging host and HTTP endpoint for card signing
//!
//! Two interchangeable bindings over the same dispatcher: a length-prefixed
//! JSON pipe on stdio (the browser native-messaging convention) and a
//! single-route HTTP server. Both are stateless between requests; each
//! hardware request opens its own card session underneath.
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod frame;
pub mod http;
pub mod protocol;
pub mod service;
pub mod stdio;
