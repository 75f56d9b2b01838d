//! # MetaBoard Testkit
//!
//! Testing utilities for the MetaBoard indexer.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known content ids and document digests
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Event builders, document builders and origin hashers
//!
//! ## Golden Vectors
//!
//! ```rust
//! use metaboard_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, id) in verify_all_vectors() {
//!     assert!(matches, "{name}: {id}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use metaboard_testkit::generators::{content_from_params, ContentParams};
//!
//! proptest! {
//!     #[test]
//!     fn content_id_is_deterministic(params: ContentParams) {
//!         let c = content_from_params(&params);
//!         prop_assert_eq!(c.content_id(), c.clone().content_id());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use metaboard_testkit::fixtures::{object, text, uint, TestFixture};
//!
//! let fixture = TestFixture::new();
//! let event = fixture.value_event(&object(vec![(0, text("h'aa'")), (1, uint(42))]), Some(1));
//! assert_eq!(event.origin_address, fixture.origin);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{memory_indexer, multi_origin_fixtures, RevertingHasher, StaticHasher, TestFixture};
pub use generators::{content_from_params, ContentParams};
pub use vectors::{all_documents, all_vectors, content_from_vector, verify_all_vectors, GoldenVector};
