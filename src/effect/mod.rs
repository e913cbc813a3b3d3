//! The IO effect core.
//!
//! Public surface: [`IO`], the [`Settler`] callback for asynchronous
//! effects, and [`ExitCase`] describing bracket outcomes. The evaluator and
//! its wait primitives are internal.
//!
//! # Examples
//!
//! ```rust
//! use dispatchio::effect::IO;
//! use dispatchio::queue::Queue;
//!
//! let effect = IO::<String, i32>::invoke(|| Ok(6)).map(|x| x * 7);
//! assert_eq!(effect.run_sync(&Queue::main()), Ok(42));
//! ```

mod eval;
mod io;
mod sync;

pub use io::{ExitCase, Settler, IO};
