// SPDX-License-Identifier: MPL-2.0

//! Shared async runtime for embedders calling the client core from
//! synchronous code (event-loop shells, tests, scripts).

use once_cell::sync::Lazy;
use std::future::Future;
use tokio::runtime::Runtime;

// Two workers cover the I/O-bound request/response traffic this crate
// generates; nothing here is CPU-heavy.
static RUNTIME: Lazy<Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .thread_name("bookcase-async")
        .build()
        .expect("failed to create async runtime")
});

/// Run a future to completion on the shared runtime, blocking the caller.
pub fn block_on<F: Future>(future: F) -> F::Output {
    RUNTIME.block_on(future)
}

/// Spawn a future on the shared runtime without blocking.
pub fn spawn<F>(future: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    RUNTIME.spawn(future)
}
