//! Bounded parallel fan-out over a finite batch.
//!
//! [`for_each_parallel`] runs an action over every item using a dedicated
//! pool of `min(workers, items)` rayon threads:
//!
//! ```text
//!              ┌────────────┐
//!  items ───▶  │ dispatcher │ ──rendezvous channel──┬──▶ worker 0 ─▶ action(item)
//!              └────────────┘                       ├──▶ worker 1 ─▶ action(item)
//!                    ▲                              └──▶ worker 2 ─▶ action(item)
//!                    └──── stops feeding once a panic is recorded
//! ```
//!
//! The dispatcher runs on the calling thread and hands items over one at a
//! time through a zero-capacity channel, so it never runs ahead of the
//! workers. Each action call is wrapped in `catch_unwind`: the first panic
//! is recorded, the dispatcher stops feeding, workers finish whatever they
//! already hold, and the call returns [`FoundryError::ActionPanic`] with the
//! panic message. Later panics are dropped.
//!
//! There is no ordering guarantee between items. Callers that need order
//! carry an index in the item.

use crate::error::{FoundryError, Result};
use parking_lot::Mutex;
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;
use std::sync::mpsc::{self, Receiver};

/// Apply `action` to every item using up to `workers` threads.
///
/// Fails with `InvalidArgument` when `workers` is zero and returns `Ok(())`
/// immediately for an empty batch.
pub fn for_each_parallel<I, F>(items: I, workers: usize, action: F) -> Result<()>
where
    I: IntoIterator,
    I::IntoIter: ExactSizeIterator,
    I::Item: Send,
    F: Fn(I::Item) + Sync,
{
    if workers == 0 {
        return Err(FoundryError::invalid(format!(
            "workers must be positive (got {workers})"
        )));
    }
    let items = items.into_iter();
    if items.len() == 0 {
        return Ok(());
    }
    let workers = workers.min(items.len());
    tracing::debug!(workers, items = items.len(), "fan-out");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("foundry-worker-{i}"))
        .build()
        .map_err(|e| FoundryError::io("start worker pool", io::Error::other(e)))?;

    let (tx, rx) = mpsc::sync_channel::<I::Item>(0);
    let rx = Mutex::new(rx);
    let first_panic = OnceLock::new();

    pool.in_place_scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|_| drain(&rx, &action, &first_panic));
        }

        for item in items {
            if first_panic.get().is_some() {
                break;
            }
            if tx.send(item).is_err() {
                break;
            }
        }
        drop(tx);
    });

    match first_panic.into_inner() {
        Some(message) => Err(FoundryError::ActionPanic(message)),
        None => Ok(()),
    }
}

/// Worker loop: take items until the channel closes.
fn drain<T, F>(rx: &Mutex<Receiver<T>>, action: &F, first_panic: &OnceLock<String>)
where
    F: Fn(T),
{
    loop {
        let next = rx.lock().recv();
        let Ok(item) = next else { break };
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| action(item))) {
            let message = panic_message(payload.as_ref());
            if first_panic.set(message).is_err() {
                tracing::trace!("dropping panic after the first");
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(e) = payload.downcast_ref::<FoundryError>() {
        e.to_string()
    } else {
        "non-string panic payload".to_string()
    }
}
