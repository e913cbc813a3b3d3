//! # dispatchio
//!
//! A lazily-evaluated IO effect system for Rust with a typed error channel,
//! resource-safe brackets, and parallel composition over named dispatch
//! queues.
//!
//! ## Overview
//!
//! The central type is [`effect::IO`]: an immutable description of a
//! computation that, when run, settles with exactly one of a success value
//! `A` or a typed error `E`. Building an `IO` executes nothing; side effects
//! happen only when one of the `run_*` entry points is called with a target
//! [`queue::Queue`].
//!
//! - **Deferred execution**: combinators build a description, never a result.
//! - **Typed errors**: failures travel through `E` and are recoverable with
//!   `handle_error_with`; anything not representable as `E` is a contract
//!   violation and fails loudly instead of entering the error channel.
//! - **Resource safety**: `bracket` guarantees release runs exactly once,
//!   even when the use phase fails.
//! - **Structured parallelism**: `par_map2`/`par_map3` fan out onto derived
//!   queues and join with first-error-wins semantics.
//!
//! ## Example
//!
//! ```rust
//! use dispatchio::effect::IO;
//! use dispatchio::queue::Queue;
//!
//! let program = IO::<String, i32>::pure(20)
//!     .map(|x| x * 2)
//!     .flat_map(|x| IO::pure(x + 2));
//!
//! assert_eq!(program.run_sync(&Queue::main()), Ok(42));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Prelude module for convenient imports.
///
/// Re-exports the types needed to build and run effects.
///
/// # Usage
///
/// ```rust
/// use dispatchio::prelude::*;
/// ```
pub mod prelude {
    pub use crate::control::Either;
    pub use crate::effect::{ExitCase, IO, Settler};
    pub use crate::queue::{Priority, Queue};
}

pub mod control;

pub mod effect;

pub mod queue;
