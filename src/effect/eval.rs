//! The effect evaluator.
//!
//! Evaluation threads a scheduling [`Queue`] through the walk of an effect
//! tree: `(effect, queue) -> (settlement, queue the effect settled on)`.
//! Sequential composition (`Pure`, `RaiseError`, `Suspend`, `Bind`) runs in
//! a flat work-list loop with an explicit heap-allocated continuation stack,
//! so arbitrarily long `flat_map` chains evaluate without native stack
//! growth. The remaining node kinds are leaves: each re-enters [`evaluate`]
//! with recursion bounded by user-visible nesting depth.
//!
//! The work-list erases the value types that cross continuation frames
//! behind `dyn Any`. The erasure is an internal detail with exactly one
//! reclaim site per direction, both structurally guaranteed: a continuation
//! built from a typed effect is only ever applied to that effect's
//! settlement. A mismatch is a bug in this module and panics loudly rather
//! than entering the typed error channel.

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;

use super::io::{ExitCase, Node, Settler, IO};
use super::sync::{ErrorSlot, SettleCell, WaitGroup};
use crate::queue::Queue;

// ============================================================
// Erased representation
// ============================================================

pub(crate) type ErasedValue = Box<dyn Any + Send>;

pub(crate) type Continuation<E> =
    Box<dyn FnOnce(Result<ErasedValue, E>) -> ErasedIO<E> + Send>;

pub(crate) struct ErasedIO<E> {
    node: ErasedNode<E>,
}

enum ErasedNode<E> {
    Pure(ErasedValue),
    RaiseError(E),
    Suspend(Box<dyn FnOnce() -> ErasedIO<E> + Send>),
    Bind {
        source: Box<dyn FnOnce() -> ErasedIO<E> + Send>,
        continuation: Continuation<E>,
    },
    Run(Box<dyn RunErased<E>>),
}

/// A leaf node in the erased tree: evaluated in one step, outside the
/// work-list loop.
trait RunErased<E>: Send {
    fn run(self: Box<Self>, queue: Queue) -> (Result<ErasedValue, E>, Queue);
}

/// Sequencing node as stored inside a typed effect: erasure is deferred
/// until the evaluator reaches it, keeping the public tree fully typed.
pub(crate) trait BindNode<E, A>: Send {
    fn erase(self: Box<Self>) -> ErasedIO<E>;
}

/// Typed leaf node: knows how to settle itself on a queue.
pub(crate) trait RunNode<E, A>: Send {
    fn run(self: Box<Self>, queue: Queue) -> (Result<A, E>, Queue);
}

fn reclaim<T: Send + 'static>(value: ErasedValue) -> T {
    match value.downcast::<T>() {
        Ok(value) => *value,
        Err(_) => panic!("effect evaluator reclaimed a value of an unexpected type"),
    }
}

// ============================================================
// Evaluation
// ============================================================

/// Evaluates an effect on `queue`, returning its settlement and the queue
/// evaluation ended on (which differs from `queue` after `continue_on`).
pub(crate) fn evaluate<E, A>(io: IO<E, A>, queue: Queue) -> (Result<A, E>, Queue)
where
    E: Send + 'static,
    A: Send + 'static,
{
    let (result, settled_on) = run_loop(erase(io), queue);
    (result.map(reclaim::<A>), settled_on)
}

fn erase<E, A>(io: IO<E, A>) -> ErasedIO<E>
where
    E: Send + 'static,
    A: Send + 'static,
{
    let node = match io.node {
        Node::Pure(value) => ErasedNode::Pure(Box::new(value) as ErasedValue),
        Node::RaiseError(error) => ErasedNode::RaiseError(error),
        Node::Suspend(thunk) => ErasedNode::Suspend(Box::new(move || erase(thunk()))),
        Node::Bind(bind) => return bind.erase(),
        Node::Async(registration) => {
            ErasedNode::Run(Box::new(AsyncRun { registration }))
        }
        Node::ContinueOn(source, target) => ErasedNode::Run(Box::new(ContinueOnRun {
            source: *source,
            target,
        })),
        Node::MapError(run) | Node::Bracket(run) | Node::ParMap(run) => {
            ErasedNode::Run(Box::new(TypedRun(run)))
        }
    };
    ErasedIO { node }
}

fn run_loop<E>(io: ErasedIO<E>, mut queue: Queue) -> (Result<ErasedValue, E>, Queue)
where
    E: Send + 'static,
{
    let mut current = io;
    let mut continuations: Vec<Continuation<E>> = Vec::new();
    loop {
        let settled = match current.node {
            ErasedNode::Pure(value) => Ok(value),
            ErasedNode::RaiseError(error) => Err(error),
            ErasedNode::Suspend(thunk) => {
                current = queue.sync(thunk);
                continue;
            }
            ErasedNode::Bind {
                source,
                continuation,
            } => {
                continuations.push(continuation);
                current = source();
                continue;
            }
            ErasedNode::Run(leaf) => {
                let (result, settled_on) = leaf.run(queue);
                queue = settled_on;
                result
            }
        };
        match continuations.pop() {
            Some(continuation) => {
                current = queue.sync(move || continuation(settled));
            }
            None => return (settled, queue),
        }
    }
}

// ============================================================
// Typed node implementations
// ============================================================

pub(crate) struct BindPair<E, A, F> {
    pub(crate) source: IO<E, A>,
    pub(crate) continuation: F,
}

impl<E, A, B, F> BindNode<E, B> for BindPair<E, A, F>
where
    E: Send + 'static,
    A: Send + 'static,
    B: Send + 'static,
    F: FnOnce(Result<A, E>) -> IO<E, B> + Send + 'static,
{
    fn erase(self: Box<Self>) -> ErasedIO<E> {
        let BindPair {
            source,
            continuation,
        } = *self;
        ErasedIO {
            node: ErasedNode::Bind {
                source: Box::new(move || erase(source)),
                continuation: Box::new(move |settled: Result<ErasedValue, E>| {
                    erase(continuation(settled.map(reclaim::<A>)))
                }),
            },
        }
    }
}

pub(crate) struct MapErrorRun<EInner, A, F> {
    pub(crate) source: IO<EInner, A>,
    pub(crate) transform: F,
}

impl<EInner, E, A, F> RunNode<E, A> for MapErrorRun<EInner, A, F>
where
    EInner: Send + 'static,
    E: Send + 'static,
    A: Send + 'static,
    F: FnOnce(EInner) -> E + Send + 'static,
{
    fn run(self: Box<Self>, queue: Queue) -> (Result<A, E>, Queue) {
        let (result, settled_on) = evaluate(self.source, queue);
        (result.map_err(self.transform), settled_on)
    }
}

pub(crate) struct BracketRun<E, R, Rel, Use> {
    pub(crate) acquire: IO<E, R>,
    pub(crate) release: Rel,
    pub(crate) use_resource: Use,
}

impl<E, R, A, Rel, Use> RunNode<E, A> for BracketRun<E, R, Rel, Use>
where
    E: Clone + Send + 'static,
    R: Clone + Send + 'static,
    A: Send + 'static,
    Rel: FnOnce(R, ExitCase<E>) -> IO<E, ()> + Send + 'static,
    Use: FnOnce(R) -> IO<E, A> + Send + 'static,
{
    fn run(self: Box<Self>, queue: Queue) -> (Result<A, E>, Queue) {
        let BracketRun {
            acquire,
            release,
            use_resource,
        } = *self;
        let (acquired, queue) = evaluate(acquire, queue);
        let resource = match acquired {
            Ok(resource) => resource,
            Err(error) => return (Err(error), queue),
        };
        // Release runs on whichever queue the use phase settled on.
        let (used, queue) = evaluate(use_resource(resource.clone()), queue);
        let exit = match &used {
            Ok(_) => ExitCase::Completed,
            Err(error) => ExitCase::Error(error.clone()),
        };
        let (released, queue) = evaluate(release(resource, exit), queue);
        match released {
            Ok(()) => (used, queue),
            // A failing release replaces the use-phase settlement, error
            // included.
            Err(error) => (Err(error), queue),
        }
    }
}

pub(crate) struct ParMap2Run<E, X, Y, F> {
    pub(crate) first: IO<E, X>,
    pub(crate) second: IO<E, Y>,
    pub(crate) combine: F,
}

impl<E, X, Y, A, F> RunNode<E, A> for ParMap2Run<E, X, Y, F>
where
    E: Send + 'static,
    X: Send + 'static,
    Y: Send + 'static,
    A: Send + 'static,
    F: FnOnce(X, Y) -> A + Send + 'static,
{
    fn run(self: Box<Self>, queue: Queue) -> (Result<A, E>, Queue) {
        let ParMap2Run {
            first,
            second,
            combine,
        } = *self;
        let group = WaitGroup::new();
        let errors = Arc::new(ErrorSlot::new());
        let first_slot = Arc::new(Mutex::new(None));
        let second_slot = Arc::new(Mutex::new(None));

        spawn_branch(&queue, "parMap1", first, &group, &errors, &first_slot);
        spawn_branch(&queue, "parMap2", second, &group, &errors, &second_slot);
        group.wait();

        if let Some(error) = errors.take() {
            return (Err(error), queue);
        }
        let x = take_branch_result(&first_slot);
        let y = take_branch_result(&second_slot);
        (Ok(combine(x, y)), queue)
    }
}

pub(crate) struct ParMap3Run<E, X, Y, Z, F> {
    pub(crate) first: IO<E, X>,
    pub(crate) second: IO<E, Y>,
    pub(crate) third: IO<E, Z>,
    pub(crate) combine: F,
}

impl<E, X, Y, Z, A, F> RunNode<E, A> for ParMap3Run<E, X, Y, Z, F>
where
    E: Send + 'static,
    X: Send + 'static,
    Y: Send + 'static,
    Z: Send + 'static,
    A: Send + 'static,
    F: FnOnce(X, Y, Z) -> A + Send + 'static,
{
    fn run(self: Box<Self>, queue: Queue) -> (Result<A, E>, Queue) {
        let ParMap3Run {
            first,
            second,
            third,
            combine,
        } = *self;
        let group = WaitGroup::new();
        let errors = Arc::new(ErrorSlot::new());
        let first_slot = Arc::new(Mutex::new(None));
        let second_slot = Arc::new(Mutex::new(None));
        let third_slot = Arc::new(Mutex::new(None));

        spawn_branch(&queue, "parMap1", first, &group, &errors, &first_slot);
        spawn_branch(&queue, "parMap2", second, &group, &errors, &second_slot);
        spawn_branch(&queue, "parMap3", third, &group, &errors, &third_slot);
        group.wait();

        if let Some(error) = errors.take() {
            return (Err(error), queue);
        }
        let x = take_branch_result(&first_slot);
        let y = take_branch_result(&second_slot);
        let z = take_branch_result(&third_slot);
        (Ok(combine(x, y, z)), queue)
    }
}

/// Dispatches one parallel branch onto a queue derived from the parent.
///
/// The branch stores its success in a typed slot or races for the shared
/// error slot; either way it leaves the group so the join can proceed.
fn spawn_branch<E, T>(
    parent: &Queue,
    suffix: &str,
    effect: IO<E, T>,
    group: &WaitGroup,
    errors: &Arc<ErrorSlot<E>>,
    slot: &Arc<Mutex<Option<T>>>,
) where
    E: Send + 'static,
    T: Send + 'static,
{
    group.enter();
    let branch_queue = parent.derive(suffix);
    let group = group.clone();
    let errors = Arc::clone(errors);
    let slot = Arc::clone(slot);
    let run_on = branch_queue.clone();
    branch_queue.dispatch(move || {
        let (result, _settled_on) = evaluate(effect, run_on);
        match result {
            Ok(value) => *slot.lock() = Some(value),
            Err(error) => {
                errors.record(error);
            }
        }
        group.leave();
    });
}

fn take_branch_result<T>(slot: &Arc<Mutex<Option<T>>>) -> T {
    slot.lock()
        .take()
        .expect("parallel branch finished without settling")
}

pub(crate) struct AsyncRun<E, A> {
    pub(crate) registration: Box<dyn FnOnce(Settler<E, A>) -> IO<E, ()> + Send>,
}

impl<E, A> RunErased<E> for AsyncRun<E, A>
where
    E: Send + 'static,
    A: Send + 'static,
{
    fn run(self: Box<Self>, queue: Queue) -> (Result<ErasedValue, E>, Queue) {
        let cell = Arc::new(SettleCell::new());
        let settler = Settler::new(Arc::clone(&cell));
        // Calling the registration only builds its effect; side effects
        // still happen under the evaluator.
        let (registered, queue) = evaluate((self.registration)(settler), queue);
        match registered {
            Ok(()) => {
                let settled = cell.wait();
                (settled.map(|value| Box::new(value) as ErasedValue), queue)
            }
            Err(error) => (Err(error), queue),
        }
    }
}

struct ContinueOnRun<E, A> {
    source: IO<E, A>,
    target: Queue,
}

impl<E, A> RunErased<E> for ContinueOnRun<E, A>
where
    E: Send + 'static,
    A: Send + 'static,
{
    fn run(self: Box<Self>, queue: Queue) -> (Result<ErasedValue, E>, Queue) {
        // The source settles wherever it settles; everything after this
        // node runs on the target queue.
        let (result, _settled_on) = evaluate(self.source, queue);
        (
            result.map(|value| Box::new(value) as ErasedValue),
            self.target,
        )
    }
}

struct TypedRun<E, A>(Box<dyn RunNode<E, A>>);

impl<E, A> RunErased<E> for TypedRun<E, A>
where
    E: Send + 'static,
    A: Send + 'static,
{
    fn run(self: Box<Self>, queue: Queue) -> (Result<ErasedValue, E>, Queue) {
        let (result, settled_on) = self.0.run(queue);
        (
            result.map(|value| Box::new(value) as ErasedValue),
            settled_on,
        )
    }
}
