//! Algebraic laws of the IO effect, checked over generated inputs.
//!
//! Laws are compared by running both sides to settlement on the shared
//! main queue; descriptions themselves have no useful equality.

use proptest::prelude::*;

use dispatchio::control::Either;
use dispatchio::effect::IO;
use dispatchio::queue::Queue;

fn run(effect: IO<String, i64>) -> Result<i64, String> {
    effect.run_sync(&Queue::main())
}

proptest! {
    #[test]
    fn monad_left_identity(a in any::<i64>(), k in -1000_i64..1000) {
        let step = move |x: i64| IO::<String, i64>::pure(x.wrapping_add(k));
        let bound = IO::<String, i64>::pure(a).flat_map(step);
        prop_assert_eq!(run(bound), run(step(a)));
    }

    #[test]
    fn monad_right_identity(a in any::<i64>()) {
        let effect = IO::<String, i64>::invoke(move || Ok(a));
        prop_assert_eq!(run(effect.flat_map(IO::pure)), Ok(a));
    }

    #[test]
    fn monad_associativity(a in any::<i64>(), k in -1000_i64..1000, m in -1000_i64..1000) {
        let f = move |x: i64| IO::<String, i64>::pure(x.wrapping_add(k));
        let g = move |x: i64| IO::<String, i64>::pure(x.wrapping_mul(m));
        let left = IO::<String, i64>::pure(a).flat_map(f).flat_map(g);
        let right = IO::<String, i64>::pure(a).flat_map(move |x| f(x).flat_map(g));
        prop_assert_eq!(run(left), run(right));
    }

    #[test]
    fn functor_identity(a in any::<i64>()) {
        let effect = IO::<String, i64>::pure(a).map(|x| x);
        prop_assert_eq!(run(effect), Ok(a));
    }

    #[test]
    fn functor_composition(a in any::<i64>(), k in -1000_i64..1000, m in -1000_i64..1000) {
        let composed = IO::<String, i64>::pure(a).map(move |x| x.wrapping_mul(m).wrapping_add(k));
        let chained = IO::<String, i64>::pure(a)
            .map(move |x| x.wrapping_mul(m))
            .map(move |x| x.wrapping_add(k));
        prop_assert_eq!(run(composed), run(chained));
    }

    #[test]
    fn raised_errors_survive_any_map(error in "[a-z]{1,12}", k in -1000_i64..1000) {
        let effect = IO::<String, i64>::raise_error(error.clone())
            .map(move |x| x.wrapping_add(k));
        prop_assert_eq!(run(effect), Err(error));
    }

    #[test]
    fn handle_error_with_is_identity_on_success(a in any::<i64>()) {
        let effect = IO::<String, i64>::pure(a)
            .handle_error_with(|_| IO::pure(0));
        prop_assert_eq!(run(effect), Ok(a));
    }

    #[test]
    fn recovery_applies_the_handler_to_the_error(error in "[a-z]{1,12}") {
        let expected = error.len() as i64;
        let effect = IO::<String, i64>::raise_error(error)
            .handle_error_with(|e| IO::pure(e.len() as i64));
        prop_assert_eq!(run(effect), Ok(expected));
    }

    #[test]
    fn map_error_composes(error in "[a-z]{1,12}") {
        let composed = IO::<String, i64>::raise_error(error.clone())
            .map_error(|e| format!("{e}!"))
            .map_error(|e| e.len());
        let fused = IO::<String, i64>::raise_error(error)
            .map_error(|e| format!("{e}!").len());
        prop_assert_eq!(run_with_len_error(composed), run_with_len_error(fused));
    }

    #[test]
    fn materialize_round_trips_through_from_either(a in any::<i64>(), fail in any::<bool>(), error in "[a-z]{1,12}") {
        let effect = if fail {
            IO::<String, i64>::raise_error(error.clone())
        } else {
            IO::<String, i64>::pure(a)
        };
        let round_tripped = effect.materialize().flat_map(IO::from_either);
        let expected = if fail { Err(error) } else { Ok(a) };
        prop_assert_eq!(run(round_tripped), expected);
    }
}

fn run_with_len_error(effect: IO<usize, i64>) -> Result<i64, usize> {
    effect.run_sync(&Queue::main())
}

#[test]
fn pure_and_invoke_agree() {
    let queue = Queue::main();
    assert_eq!(
        IO::<String, i64>::pure(5).run_sync(&queue),
        IO::<String, i64>::invoke(|| Ok(5)).run_sync(&queue)
    );
}

#[test]
fn either_settlement_matches_result_settlement() {
    let queue = Queue::main();
    let as_result = IO::<String, i64>::raise_error("x".to_string()).run_sync(&queue);
    let as_either = IO::<String, i64>::raise_error("x".to_string()).run_sync_either(&queue);
    assert_eq!(as_either, Either::from(as_result));
}
