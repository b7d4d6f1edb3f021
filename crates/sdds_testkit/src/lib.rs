//! # SDDS Testkit
//!
//! Test utilities for SDDS remote tree sync.
//!
//! This crate provides:
//! - Canonical schema documents and tree snapshot helpers
//! - Property-based generators for schema documents in both encodings
//! - `EngineHarness`, a sync engine wired to a mock transport and a manual clock
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sdds_testkit::prelude::*;
//!
//! #[test]
//! fn links_observed_struct() {
//!     let mut h = EngineHarness::connected(DEMO_SCHEMA);
//!     h.observe("sub.filter");
//!     h.advance_ms(100);
//!     assert_eq!(h.take_sent(), ["L 1 sub"]);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod harness;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::harness::*;
}

pub use fixtures::*;
pub use generators::*;
pub use harness::*;
