//! Generic implementations of the integration algorithms.
//!
//! These functions are generic over numr's `Runtime` and are called by the
//! public entry points of [`crate::integrate`] and [`crate::cde`].

pub mod ode;
