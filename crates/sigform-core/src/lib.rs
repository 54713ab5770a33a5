//! Core types for the sigform annotation workbench.
//!
//! This crate contains the in-memory domain model: signals, forms
//! (points, parameters, steps, tracks, primitive objects), the
//! primitive class registry, argument coercion, and form validation.
//! Persistence and execution live in their own crates.

pub mod builtins;
pub mod coerce;
pub mod form;
pub mod registry;
pub mod signal;
pub mod validation;
