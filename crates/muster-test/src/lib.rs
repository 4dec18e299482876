//! Shared test fixtures for Muster crates.
//!
//! Provides a concrete [`GridBoard`] implementation of the `Board`
//! collaborator trait plus deterministic scenario generators. Fixture-only:
//! nothing here is intended for production use.
//!
//! # Usage
//!
//! Add as a dev-dependency in your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! muster-test = { workspace = true }
//! ```

pub mod grid;

pub use grid::GridBoard;
