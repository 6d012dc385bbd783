//! Pipeline stages for captcha solving.
//!
//! Each submodule implements exactly one step, so each can be tested on
//! its own and swapped (a different engine, a different fetcher) without
//! touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ preprocess ──▶ segment ──▶ solver ⟲ recognize
//! (bytes)   (binary)       (6 boxes)   (≤12 attempts × 6 letters)
//! ```
//!
//! 1. [`input`]      — URL, path or bytes → raw image bytes
//! 2. [`preprocess`] — decode, normalise, threshold → [`preprocess::BinaryRaster`]
//! 3. [`segment`]    — density-minimum cuts → [`segment::LetterBox`]es, once
//! 4. [`solver`]     — rotation-sweep retry loop over the boxes
//! 5. [`recognize`]  — crop, rotate, run the engine for one letter
//!
//! [`encode`], [`postprocess`] and [`dump`] support the stages above.

pub mod dump;
pub mod encode;
pub mod input;
pub mod postprocess;
pub mod preprocess;
pub mod recognize;
pub mod segment;
pub mod solver;
