//! Background tasks.
//!
//! Each submodule provides an async function intended to be spawned via
//! `tokio::spawn`. Tasks report their outcome only through shared state; no
//! handle is kept by the spawner.

pub mod csv_job;
