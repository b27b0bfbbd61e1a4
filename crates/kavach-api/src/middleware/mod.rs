//! # Middleware Stack
//!
//! Tower middleware for the API layer, outermost to innermost:
//! - [`metrics`]: Prometheus-compatible request metrics.
//! - [`shield`]: per-client rate limiting, duplicate-query-parameter
//!   rejection, and hardening response headers.
//! - [`sanitize`]: one-time JSON body sanitization at the boundary.
//! - [`compliance`]: the named-stage compliance gate (public-path
//!   bypass, session freshness, audit trail, document policy).

pub mod compliance;
pub mod metrics;
pub mod sanitize;
pub mod shield;
