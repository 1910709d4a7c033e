//! Delicious Core - Shared types library.
//!
//! This crate provides common types used across the Dang That's Delicious
//! application: validated email addresses, type-safe entity IDs, and
//! geographic points.
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
