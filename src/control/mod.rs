//! Control structures shared across the effect system.
//!
//! This module currently provides a single collaborator type:
//!
//! - [`Either`]: a value that is one of two alternatives, used as the
//!   settlement value delivered to effect callbacks and returned by
//!   `run_sync_either`.
//!
//! # Examples
//!
//! ```rust
//! use dispatchio::control::Either;
//!
//! let settled: Either<String, i32> = Either::Right(42);
//! let message = settled.fold(
//!     |error| format!("failed: {error}"),
//!     |value| format!("got {value}"),
//! );
//! assert_eq!(message, "got 42");
//! ```

mod either;

pub use either::Either;
