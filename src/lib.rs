//! trafficmask-panel: control-plane panel for a supervised tunnel process.
//!
//! This crate is the synchronization engine behind the web panel. It owns
//! three concerns with real concurrency hazards and keeps the rest (HTTP
//! routing, static files, CORS) to the embedding layer:
//!
//! - **Keys**: a concurrency-safe license key store with usage-limited
//!   validation semantics
//! - **Hub**: a realtime broadcast hub fanning typed state snapshots out to
//!   WebSocket subscribers on a fixed cadence
//! - **Bridge**: a line-oriented command channel to the external privileged
//!   tunnel process over a Unix socket, with a degraded no-op mode where
//!   that transport does not exist
//!
//! The [`service::ControlPlaneService`] façade ties them together and is
//! the surface the HTTP layer programs against; [`supervisor`] wires the
//! components and owns the background tasks.

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod bridge;
pub mod cli;
pub mod config;
pub mod hub;
pub mod journal;
pub mod keys;
pub mod service;
pub mod snapshot;
pub mod supervisor;
