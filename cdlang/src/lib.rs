//! A compiler for contract-testing scenarios.
//!
//! Scenario files describe gNMI and control-plane conversations with a
//! device under test. They are parsed ([`syntax`]), built into a
//! [`dom::Dom`] ([`build`]) and then resolved by a fixed sequence of
//! [`pass`]es, ready for a code generator to consume.

pub mod build;
pub mod dom;
pub mod driver;
pub mod files;
pub mod pass;
pub mod reporting;
pub mod source;
pub mod syntax;

pub use driver::{Driver, Format, Status};
