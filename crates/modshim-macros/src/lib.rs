//! Test helper macros for the modshim workspace.
//!
//! # Macros Overview
//!
//! ## Assertions
//! - [`assert_matches!`] - Assert that a value matches a pattern
//! - [`assert_ok!`] - Unwrap an `Ok` or panic with the error
//! - [`assert_contains!`] - Assert that a string contains a substring
//! - [`assert_diagnostic!`] - Assert that a diagnostic with a code was reported
//! - [`assert_no_diagnostic!`] - Assert that no diagnostic with a code was reported
//! - [`assert_no_errors!`] - Assert that no Error-severity diagnostic was reported
//!
//! ## Collections
//! - [`names!`] - Build an ordered `Vec<String>` of export names
//! - [`hashset!`] - Create a HashSet literal
//!
//! # Examples
//!
//! ```
//! use modshim_macros::*;
//!
//! let exported = names!["Foo", "bar"];
//! assert_eq!(exported, vec!["Foo".to_string(), "bar".to_string()]);
//!
//! let set = hashset! { "Foo", "bar" };
//! assert!(set.contains("bar"));
//! ```

mod collections;
mod testing;
