//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain logic and manages runtime behavior:
//! - Throttling evaluator (per-key suppression state)
//! - Logger (filtering, enrichment, routing and concurrent delivery)
//! - Configuration resolution (descriptors to an immutable snapshot)
//! - Dispatch metrics
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters and callers implement. This keeps the application layer
//! independent from transport details.

pub mod config;
pub mod error;
pub mod logger;
pub mod metrics;
pub mod ports;
pub mod throttle;
