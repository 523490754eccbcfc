//! Domain logic for the CSV email-flagging service.
//!
//! Everything here is independent of HTTP: the email-likeness predicate,
//! the streaming row transformer, the in-memory job registry and the
//! local file store used by the background worker.

pub mod email;
pub mod error;
pub mod jobs;
pub mod storage;
pub mod transform;
pub mod types;
