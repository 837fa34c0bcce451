// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v1.1
// Author: Lukas Bower
// Date Modified: 2027-08-13

//! Small helpers shared across the crate.

/// Simple non-cryptographic RNG.
pub mod tiny_rng;
