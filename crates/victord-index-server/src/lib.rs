//! Vector-index server library.
//!
//! The [`state`] module holds the actual INSERT/DELETE/SEARCH state machine;
//! `main.rs` is a thin CLI and wiring layer on top of it. Kept
//! as a library, rather than folding everything into the binary, so the
//! integration test suite can drive [`state::IndexState`] directly instead
//! of spawning the compiled binary as a subprocess.

pub mod state;
