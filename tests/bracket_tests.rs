//! Resource safety: bracket acquire/use/release discipline.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use dispatchio::effect::{ExitCase, IO};
use dispatchio::queue::{Priority, Queue};

fn test_queue(label: &str) -> Queue {
    Queue::new(label, Priority::Default)
}

#[test]
fn test_release_runs_exactly_once_on_success() {
    let releases = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&releases);
    let effect = IO::<String, usize>::bracket(
        IO::pure(7_usize),
        move |_resource, _exit| {
            counter.fetch_add(1, Ordering::SeqCst);
            IO::pure(())
        },
        |resource| IO::pure(resource * 2),
    );
    assert_eq!(effect.run_sync(&test_queue("release-once")), Ok(14));
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[test]
fn test_release_runs_after_a_failing_use() {
    let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let acquire_log = Arc::clone(&log);
    let use_log = Arc::clone(&log);
    let release_log = Arc::clone(&log);
    let effect = IO::<String, i32>::bracket(
        IO::invoke(move || {
            acquire_log.lock().push("acquire".to_string());
            Ok("handle".to_string())
        }),
        move |_resource, exit| {
            release_log.lock().push(format!("release:{exit:?}"));
            IO::pure(())
        },
        move |_resource| {
            use_log.lock().push("use".to_string());
            IO::raise_error("use failed".to_string())
        },
    );
    assert_eq!(
        effect.run_sync(&test_queue("release-after-failure")),
        Err("use failed".to_string())
    );
    assert_eq!(
        *log.lock(),
        vec![
            "acquire".to_string(),
            "use".to_string(),
            format!("release:{:?}", ExitCase::Error("use failed".to_string())),
        ]
    );
}

#[test]
fn test_release_sees_completed_on_success() {
    let seen: Arc<Mutex<Option<ExitCase<String>>>> = Arc::new(Mutex::new(None));
    let witness = Arc::clone(&seen);
    let effect = IO::<String, i32>::bracket(
        IO::pure(1),
        move |_resource, exit| {
            *witness.lock() = Some(exit);
            IO::pure(())
        },
        |resource| IO::pure(resource + 1),
    );
    assert_eq!(effect.run_sync(&test_queue("exit-completed")), Ok(2));
    assert_eq!(*seen.lock(), Some(ExitCase::Completed));
}

#[test]
fn test_failed_acquire_skips_use_and_release() {
    let touched = Arc::new(AtomicUsize::new(0));
    let release_witness = Arc::clone(&touched);
    let use_witness = Arc::clone(&touched);
    let effect = IO::<String, i32>::bracket(
        IO::raise_error("no resource".to_string()),
        move |_resource: i32, _exit| {
            release_witness.fetch_add(1, Ordering::SeqCst);
            IO::pure(())
        },
        move |_resource| {
            use_witness.fetch_add(1, Ordering::SeqCst);
            IO::pure(0)
        },
    );
    assert_eq!(
        effect.run_sync(&test_queue("acquire-fails")),
        Err("no resource".to_string())
    );
    assert_eq!(touched.load(Ordering::SeqCst), 0);
}

#[test]
fn test_failing_release_replaces_a_success() {
    let effect = IO::<String, i32>::bracket(
        IO::pure(1),
        |_resource, _exit| IO::raise_error("release failed".to_string()),
        |resource| IO::pure(resource + 1),
    );
    assert_eq!(
        effect.run_sync(&test_queue("release-error")),
        Err("release failed".to_string())
    );
}

#[test]
fn test_failing_release_replaces_a_use_error() {
    let effect = IO::<String, i32>::bracket(
        IO::pure(1),
        |_resource, _exit| IO::raise_error("release failed".to_string()),
        |_resource| IO::raise_error("use failed".to_string()),
    );
    assert_eq!(
        effect.run_sync(&test_queue("release-error-precedence")),
        Err("release failed".to_string())
    );
}

#[test]
fn test_bracket_composes_with_later_steps() {
    let effect = IO::<String, i32>::bracket(
        IO::pure(20),
        |_resource, _exit| IO::pure(()),
        |resource| IO::pure(resource + 1),
    )
    .map(|value| value * 2);
    assert_eq!(effect.run_sync(&test_queue("composes")), Ok(42));
}

#[test]
fn test_nested_brackets_release_inner_first() {
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let inner_log = Arc::clone(&order);
    let outer_log = Arc::clone(&order);
    let effect = IO::<String, i32>::bracket(
        IO::pure(1),
        move |_resource, _exit| {
            outer_log.lock().push("outer-release");
            IO::pure(())
        },
        move |outer| {
            IO::bracket(
                IO::pure(outer + 1),
                move |_resource, _exit| {
                    inner_log.lock().push("inner-release");
                    IO::pure(())
                },
                |inner| IO::pure(inner * 10),
            )
        },
    );
    assert_eq!(effect.run_sync(&test_queue("nested")), Ok(20));
    assert_eq!(*order.lock(), vec!["inner-release", "outer-release"]);
}
