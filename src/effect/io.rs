//! The `IO` effect type.
//!
//! An [`IO<E, A>`] is an immutable description of a computation that, when
//! run, settles with exactly one of a success value `A` or a typed error
//! `E`. Construction is completely lazy: combinators only build a bigger
//! description, and side effects happen when one of the `run_*` entry
//! points hands the description to the evaluator together with a target
//! [`Queue`].
//!
//! Failures a program anticipates travel through `E` and can be recovered
//! with [`handle_error_with`](IO::handle_error_with). Failures the types
//! rule out (panicking closures, settlement-type mismatches) are contract
//! violations and abort loudly instead of entering the error channel.
//!
//! # Examples
//!
//! ```rust
//! use dispatchio::effect::IO;
//! use dispatchio::queue::Queue;
//!
//! let program = IO::<String, i32>::invoke(|| Ok(20))
//!     .map(|x| x * 2)
//!     .flat_map(|x| IO::pure(x + 2));
//!
//! assert_eq!(program.run_sync(&Queue::main()), Ok(42));
//! ```

use std::sync::Arc;
use std::time::Duration;

use super::eval::{
    evaluate, BindNode, BindPair, BracketRun, MapErrorRun, ParMap2Run, ParMap3Run, RunNode,
};
use super::sync::SettleCell;
use crate::control::Either;
use crate::queue::Queue;

// ============================================================
// Node
// ============================================================

pub(crate) enum Node<E, A> {
    Pure(A),
    RaiseError(E),
    Suspend(Box<dyn FnOnce() -> IO<E, A> + Send>),
    Bind(Box<dyn BindNode<E, A>>),
    MapError(Box<dyn RunNode<E, A>>),
    Async(Box<dyn FnOnce(Settler<E, A>) -> IO<E, ()> + Send>),
    ContinueOn(Box<IO<E, A>>, Queue),
    Bracket(Box<dyn RunNode<E, A>>),
    ParMap(Box<dyn RunNode<E, A>>),
}

// ============================================================
// ExitCase
// ============================================================

/// How the use phase of a [`bracket`](IO::bracket) ended, as seen by the
/// release action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExitCase<E> {
    /// The use phase settled successfully.
    Completed,
    /// The use phase settled with a typed error.
    Error(E),
}

// ============================================================
// Settler
// ============================================================

/// The settlement callback handed to an [`async_f`](IO::async_f)
/// registration.
///
/// Cloneable and callable from any thread. The first call to
/// [`settle`](Settler::settle) decides the outcome; later calls are no-ops.
pub struct Settler<E, A> {
    cell: Arc<SettleCell<E, A>>,
}

impl<E, A> Clone for Settler<E, A> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<E, A> Settler<E, A> {
    pub(crate) fn new(cell: Arc<SettleCell<E, A>>) -> Self {
        Self { cell }
    }

    /// Settles the pending asynchronous effect with `outcome`.
    ///
    /// First settlement wins; any later settlement, success or error, is
    /// silently ignored.
    pub fn settle(&self, outcome: Either<E, A>) {
        self.cell.settle(outcome.into_result());
    }
}

// ============================================================
// IO
// ============================================================

/// A lazily-evaluated computation settling with `Ok(A)` or `Err(E)`.
///
/// See the [module documentation](self) for the execution model.
pub struct IO<E, A> {
    pub(crate) node: Node<E, A>,
}

impl<E, A> IO<E, A>
where
    E: Send + 'static,
    A: Send + 'static,
{
    // ------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------

    /// Lifts an already-computed value into a successful effect.
    pub fn pure(value: A) -> Self {
        Self {
            node: Node::Pure(value),
        }
    }

    /// Lifts a typed error into a failing effect.
    pub fn raise_error(error: E) -> Self {
        Self {
            node: Node::RaiseError(error),
        }
    }

    /// Defers building an effect until evaluation reaches it.
    ///
    /// The thunk runs on the evaluation queue, once, when the effect is
    /// run — never at construction time.
    pub fn suspend<F>(thunk: F) -> Self
    where
        F: FnOnce() -> Self + Send + 'static,
    {
        Self {
            node: Node::Suspend(Box::new(thunk)),
        }
    }

    /// Wraps a fallible side effect.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dispatchio::effect::IO;
    /// use dispatchio::queue::Queue;
    ///
    /// let effect = IO::<String, u64>::invoke(|| Ok(7));
    /// assert_eq!(effect.run_sync(&Queue::main()), Ok(7));
    /// ```
    pub fn invoke<F>(side_effect: F) -> Self
    where
        F: FnOnce() -> Result<A, E> + Send + 'static,
    {
        Self::suspend(move || Self::from_result(side_effect()))
    }

    /// Wraps a side effect returning an [`Either`] settlement.
    pub fn invoke_either<F>(side_effect: F) -> Self
    where
        F: FnOnce() -> Either<E, A> + Send + 'static,
    {
        Self::suspend(move || Self::from_either(side_effect()))
    }

    /// Lifts an already-settled `Result` into an effect.
    pub fn from_result(result: Result<A, E>) -> Self {
        match result {
            Ok(value) => Self::pure(value),
            Err(error) => Self::raise_error(error),
        }
    }

    /// Lifts an already-settled [`Either`] into an effect.
    pub fn from_either(either: Either<E, A>) -> Self {
        Self::from_result(either.into_result())
    }

    /// Builds an effect from an asynchronous registration.
    ///
    /// The registration receives a [`Settler`] and returns an effect that
    /// performs the registration side effect (starting a thread, enqueueing
    /// a callback). Evaluation runs the returned effect, then blocks the
    /// evaluating worker until the settler is called. If the registration
    /// itself fails, its error is the settlement and the settler is never
    /// awaited.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dispatchio::control::Either;
    /// use dispatchio::effect::IO;
    /// use dispatchio::queue::Queue;
    ///
    /// let effect = IO::<String, i32>::async_f(|settler| {
    ///     IO::invoke(move || {
    ///         std::thread::spawn(move || settler.settle(Either::Right(9)));
    ///         Ok(())
    ///     })
    /// });
    /// assert_eq!(effect.run_sync(&Queue::main()), Ok(9));
    /// ```
    pub fn async_f<F>(registration: F) -> Self
    where
        F: FnOnce(Settler<E, A>) -> IO<E, ()> + Send + 'static,
    {
        Self {
            node: Node::Async(Box::new(registration)),
        }
    }

    // ------------------------------------------------------------
    // Sequential composition
    // ------------------------------------------------------------

    fn bind<B, F>(self, continuation: F) -> IO<E, B>
    where
        B: Send + 'static,
        F: FnOnce(Result<A, E>) -> IO<E, B> + Send + 'static,
    {
        IO {
            node: Node::Bind(Box::new(BindPair {
                source: self,
                continuation,
            })),
        }
    }

    /// Transforms the success value.
    pub fn map<B, F>(self, function: F) -> IO<E, B>
    where
        B: Send + 'static,
        F: FnOnce(A) -> B + Send + 'static,
    {
        self.bind(move |settled| match settled {
            Ok(value) => IO::pure(function(value)),
            Err(error) => IO::raise_error(error),
        })
    }

    /// Sequences a dependent effect after this one.
    ///
    /// An error short-circuits: the continuation never runs.
    pub fn flat_map<B, F>(self, function: F) -> IO<E, B>
    where
        B: Send + 'static,
        F: FnOnce(A) -> IO<E, B> + Send + 'static,
    {
        self.bind(move |settled| match settled {
            Ok(value) => function(value),
            Err(error) => IO::raise_error(error),
        })
    }

    /// Alias for [`flat_map`](IO::flat_map).
    pub fn and_then<B, F>(self, function: F) -> IO<E, B>
    where
        B: Send + 'static,
        F: FnOnce(A) -> IO<E, B> + Send + 'static,
    {
        self.flat_map(function)
    }

    /// Sequences an independent effect, discarding this one's value.
    pub fn then<B>(self, next: IO<E, B>) -> IO<E, B>
    where
        B: Send + 'static,
    {
        self.flat_map(move |_| next)
    }

    /// Sequentially zips two effects through a combining function.
    pub fn map2<B, C, F>(self, other: IO<E, B>, combine: F) -> IO<E, C>
    where
        B: Send + 'static,
        C: Send + 'static,
        F: FnOnce(A, B) -> C + Send + 'static,
    {
        self.flat_map(move |a| other.map(move |b| combine(a, b)))
    }

    /// Sequentially pairs two effects.
    pub fn product<B>(self, other: IO<E, B>) -> IO<E, (A, B)>
    where
        B: Send + 'static,
    {
        self.map2(other, |a, b| (a, b))
    }

    // ------------------------------------------------------------
    // Error channel
    // ------------------------------------------------------------

    /// Transforms the typed error, leaving a success untouched.
    pub fn map_error<E2, F>(self, transform: F) -> IO<E2, A>
    where
        E2: Send + 'static,
        F: FnOnce(E) -> E2 + Send + 'static,
    {
        IO {
            node: Node::MapError(Box::new(MapErrorRun {
                source: self,
                transform,
            })),
        }
    }

    /// Recovers from a typed error with a fallback effect.
    pub fn handle_error_with<F>(self, recover: F) -> Self
    where
        F: FnOnce(E) -> Self + Send + 'static,
    {
        self.bind(move |settled| match settled {
            Ok(value) => IO::pure(value),
            Err(error) => recover(error),
        })
    }

    /// Reflects the settlement into the success channel.
    ///
    /// The resulting effect always succeeds, with `Left` carrying what
    /// would have been the error.
    pub fn materialize(self) -> IO<E, Either<E, A>> {
        self.bind(|settled| IO::pure(Either::from(settled)))
    }

    /// Normalizes this effect to its settlement, evaluated on `queue`.
    ///
    /// The returned effect defers the evaluation until it is itself run,
    /// then behaves as a plain `pure`/`raise_error` of the outcome.
    pub fn attempt(self, queue: &Queue) -> Self {
        let queue = queue.clone();
        Self::suspend(move || Self::from_result(self.run_sync(&queue)))
    }

    // ------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------

    /// Relocates everything sequenced after this effect onto `queue`.
    ///
    /// The effect itself still settles wherever its own structure dictates;
    /// only subsequent steps move.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dispatchio::effect::IO;
    /// use dispatchio::queue::{Priority, Queue};
    ///
    /// let worker = Queue::new("doc-worker", Priority::Default);
    /// let effect = IO::<String, ()>::pure(())
    ///     .continue_on(&worker)
    ///     .map(|()| std::thread::current().name().unwrap_or("").to_string());
    /// assert_eq!(effect.run_sync(&Queue::main()), Ok("doc-worker".to_string()));
    /// ```
    #[must_use]
    pub fn continue_on(self, queue: &Queue) -> Self {
        Self {
            node: Node::ContinueOn(Box::new(self), queue.clone()),
        }
    }

    // ------------------------------------------------------------
    // Resource safety
    // ------------------------------------------------------------

    /// Acquires a resource, uses it, and guarantees release.
    ///
    /// `release` runs exactly once — after the use phase settles, on the
    /// queue it settled on — with an [`ExitCase`] describing how. If
    /// `acquire` fails, neither `use_resource` nor `release` runs. A
    /// failing release replaces the use-phase settlement, including a
    /// use-phase error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dispatchio::effect::IO;
    /// use dispatchio::queue::Queue;
    ///
    /// let effect = IO::<String, usize>::bracket(
    ///     IO::pure("resource".to_string()),
    ///     |_resource, _exit| IO::pure(()),
    ///     |resource| IO::pure(resource.len()),
    /// );
    /// assert_eq!(effect.run_sync(&Queue::main()), Ok(8));
    /// ```
    pub fn bracket<R, Rel, Use>(acquire: IO<E, R>, release: Rel, use_resource: Use) -> Self
    where
        E: Clone,
        R: Clone + Send + 'static,
        Rel: FnOnce(R, ExitCase<E>) -> IO<E, ()> + Send + 'static,
        Use: FnOnce(R) -> Self + Send + 'static,
    {
        Self {
            node: Node::Bracket(Box::new(BracketRun {
                acquire,
                release,
                use_resource,
            })),
        }
    }

    // ------------------------------------------------------------
    // Parallel composition
    // ------------------------------------------------------------

    /// Runs two effects in parallel and combines their successes.
    ///
    /// Each branch evaluates on its own queue derived from the evaluation
    /// queue. The join waits for both branches; if any fail, the first
    /// error to be recorded wins and later errors are discarded.
    pub fn par_map2<X, Y, F>(first: IO<E, X>, second: IO<E, Y>, combine: F) -> Self
    where
        X: Send + 'static,
        Y: Send + 'static,
        F: FnOnce(X, Y) -> A + Send + 'static,
    {
        Self {
            node: Node::ParMap(Box::new(ParMap2Run {
                first,
                second,
                combine,
            })),
        }
    }

    /// Runs three effects in parallel and combines their successes.
    ///
    /// Same join semantics as [`par_map2`](IO::par_map2).
    pub fn par_map3<X, Y, Z, F>(
        first: IO<E, X>,
        second: IO<E, Y>,
        third: IO<E, Z>,
        combine: F,
    ) -> Self
    where
        X: Send + 'static,
        Y: Send + 'static,
        Z: Send + 'static,
        F: FnOnce(X, Y, Z) -> A + Send + 'static,
    {
        Self {
            node: Node::ParMap(Box::new(ParMap3Run {
                first,
                second,
                third,
                combine,
            })),
        }
    }

    // ------------------------------------------------------------
    // Iteration
    // ------------------------------------------------------------

    /// Stack-safe effectful iteration.
    ///
    /// Repeatedly applies `step`, continuing on `Left(state)` and finishing
    /// on `Right(value)`. Safe for hundreds of thousands of iterations.
    pub fn tail_rec<S, F>(initial: S, step: F) -> Self
    where
        S: Send + 'static,
        F: Fn(S) -> IO<E, Either<S, A>> + Send + Clone + 'static,
    {
        step(initial).flat_map(move |outcome| match outcome {
            Either::Left(next) => IO::suspend(move || Self::tail_rec(next, step)),
            Either::Right(done) => IO::pure(done),
        })
    }

    // ------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------

    /// Runs the effect on `queue`, blocking until it settles.
    pub fn run_sync(self, queue: &Queue) -> Result<A, E> {
        let (result, _settled_on) = evaluate(self, queue.clone());
        result
    }

    /// Runs the effect on `queue`, returning the settlement as an
    /// [`Either`].
    pub fn run_sync_either(self, queue: &Queue) -> Either<E, A> {
        Either::from(self.run_sync(queue))
    }

    /// Runs the effect asynchronously on `queue`, delivering the
    /// settlement to `callback` on that queue's worker.
    pub fn run_async<F>(self, queue: &Queue, callback: F)
    where
        F: FnOnce(Either<E, A>) + Send + 'static,
    {
        let run_on = queue.clone();
        queue.dispatch(move || callback(self.run_sync_either(&run_on)));
    }

    /// Sequences a settlement-consuming effect after this one.
    ///
    /// Lazy counterpart of [`run_async`](IO::run_async): nothing executes
    /// until the returned effect is run, at which point `callback` receives
    /// the settlement and its effect runs in turn.
    pub fn run_async_io<F>(self, callback: F) -> IO<E, ()>
    where
        F: FnOnce(Either<E, A>) -> IO<E, ()> + Send + 'static,
    {
        self.bind(move |settled| callback(Either::from(settled)))
    }

    /// Builds an effect from a thunk and runs it on `queue`, blocking.
    pub fn run_blocking<F>(queue: &Queue, make: F) -> Result<A, E>
    where
        F: FnOnce() -> Self + Send + 'static,
    {
        Self::suspend(make).run_sync(queue)
    }

    /// Builds an effect from a thunk and runs it on `queue`, delivering
    /// the settlement to `callback` without blocking the caller.
    pub fn run_non_blocking<F, C>(queue: &Queue, make: F, callback: C)
    where
        F: FnOnce() -> Self + Send + 'static,
        C: FnOnce(Either<E, A>) + Send + 'static,
    {
        Self::suspend(make).run_async(queue, callback);
    }
}

impl<E> IO<E, ()>
where
    E: Send + 'static,
{
    /// Sleeps for `duration` on the evaluation queue's worker.
    pub fn delay(duration: Duration) -> Self {
        Self::suspend(move || {
            std::thread::sleep(duration);
            Self::pure(())
        })
    }
}

impl<E, X, Y> IO<E, (X, Y)>
where
    E: Send + 'static,
    X: Send + 'static,
    Y: Send + 'static,
{
    /// Zips two fallible side effects into a pair-producing effect.
    pub fn merge<FX, FY>(first: FX, second: FY) -> Self
    where
        FX: FnOnce() -> Result<X, E> + Send + 'static,
        FY: FnOnce() -> Result<Y, E> + Send + 'static,
    {
        IO::invoke(first).product(IO::invoke(second))
    }
}

impl<E, X, Y, Z> IO<E, (X, Y, Z)>
where
    E: Send + 'static,
    X: Send + 'static,
    Y: Send + 'static,
    Z: Send + 'static,
{
    /// Zips three fallible side effects into a triple-producing effect.
    pub fn merge3<FX, FY, FZ>(first: FX, second: FY, third: FZ) -> Self
    where
        FX: FnOnce() -> Result<X, E> + Send + 'static,
        FY: FnOnce() -> Result<Y, E> + Send + 'static,
        FZ: FnOnce() -> Result<Z, E> + Send + 'static,
    {
        IO::invoke(first).map2(
            IO::invoke(second).product(IO::invoke(third)),
            |x, (y, z)| (x, y, z),
        )
    }
}
