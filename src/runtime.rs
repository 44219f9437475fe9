// SPDX-License-Identifier: MPL-2.0

//! Process-wide Tokio runtime.
//!
//! Library code that needs a background task goes through [`spawn`], so it
//! works both inside a caller's runtime and from plain synchronous code.

use once_cell::sync::Lazy;
use std::future::Future;
use tokio::runtime::{Handle, Runtime};
use tokio::task::JoinHandle;

/// Store calls are short and link previews are I/O bound, so two workers
/// are plenty.
static RUNTIME: Lazy<Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .thread_name("sharewell-async")
        .build()
        .expect("failed to create async runtime")
});

/// Drive `future` to completion from synchronous code.
pub fn block_on<F: Future>(future: F) -> F::Output {
    RUNTIME.block_on(future)
}

/// Run `future` in the background. Uses the runtime the caller is already
/// on, if any, else the shared one.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => handle.spawn(future),
        Err(_) => {
            tracing::trace!("no runtime in context, spawning on the shared one");
            RUNTIME.spawn(future)
        }
    }
}
