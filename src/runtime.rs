//! Runtime abstraction layer for async operations
//!
//! The engine needs exactly three things from an executor: detached timer
//! tasks, sleeping, and timeouts. This module provides them on Tokio (the
//! default) or on the browser event loop (`wasm` feature).

use crate::prelude::{Duration, Future};

/// Handle to a spawned async task
pub trait AsyncHandle: Send + Sync {
    /// Check if the task is finished
    fn is_finished(&self) -> bool;

    /// Cancel the task
    fn cancel(&self);
}

/// The future did not complete in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed;

/// Spawn a detached task on the active runtime.
pub fn spawn<F>(future: F) -> Box<dyn AsyncHandle>
where
    F: Future<Output = ()> + Send + 'static,
{
    spawners::spawn_boxed(Box::pin(future))
}

/// Run `future` to completion unless `duration` passes first.
pub async fn timeout<F>(duration: Duration, future: F) -> Result<F::Output, Elapsed>
where
    F: Future,
{
    use futures::future::{select, Either};

    let future = Box::pin(future);
    let delay = Box::pin(sleep(duration));
    match select(future, delay).await {
        Either::Left((output, _)) => Ok(output),
        Either::Right(((), _)) => Err(Elapsed),
    }
}

#[cfg(feature = "tokio-runtime")]
pub async fn sleep(duration: Duration) {
    ::tokio::time::sleep(duration).await;
}

#[cfg(all(feature = "wasm", not(feature = "tokio-runtime")))]
pub async fn sleep(duration: Duration) {
    let millis = duration.as_millis().min(i32::MAX as u128) as i32;
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        if let Some(window) = web_sys::window() {
            let _ = window
                .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, millis);
        }
    });
    let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
}

#[cfg(not(any(feature = "tokio-runtime", feature = "wasm")))]
pub async fn sleep(duration: Duration) {
    // No timer source available: never resolve early, never block.
    let _ = duration;
    futures::future::pending::<()>().await;
}

/// Default spawner implementations
mod spawners {
    use super::AsyncHandle;
    use crate::prelude::{Future, Pin};

    #[cfg(feature = "tokio-runtime")]
    pub(super) fn spawn_boxed(
        future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
    ) -> Box<dyn AsyncHandle> {
        Box::new(TokioHandle(::tokio::spawn(future)))
    }

    #[cfg(feature = "tokio-runtime")]
    struct TokioHandle(::tokio::task::JoinHandle<()>);

    #[cfg(feature = "tokio-runtime")]
    impl AsyncHandle for TokioHandle {
        fn is_finished(&self) -> bool {
            self.0.is_finished()
        }

        fn cancel(&self) {
            self.0.abort();
        }
    }

    #[cfg(all(feature = "wasm", not(feature = "tokio-runtime")))]
    pub(super) fn spawn_boxed(
        future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
    ) -> Box<dyn AsyncHandle> {
        use futures::future::{AbortHandle, Abortable};
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let (abort, registration) = AbortHandle::new_pair();
        let finished = Arc::new(AtomicBool::new(false));
        let done = finished.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let _ = Abortable::new(future, registration).await;
            done.store(true, Ordering::SeqCst);
        });
        Box::new(WasmHandle { abort, finished })
    }

    #[cfg(all(feature = "wasm", not(feature = "tokio-runtime")))]
    struct WasmHandle {
        abort: futures::future::AbortHandle,
        finished: std::sync::Arc<std::sync::atomic::AtomicBool>,
    }

    #[cfg(all(feature = "wasm", not(feature = "tokio-runtime")))]
    impl AsyncHandle for WasmHandle {
        fn is_finished(&self) -> bool {
            self.finished.load(std::sync::atomic::Ordering::SeqCst)
        }

        fn cancel(&self) {
            self.abort.abort();
        }
    }

    #[cfg(not(any(feature = "tokio-runtime", feature = "wasm")))]
    pub(super) fn spawn_boxed(
        future: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
    ) -> Box<dyn AsyncHandle> {
        drop(future);
        panic!("No async runtime available. Enable 'tokio-runtime' or 'wasm' feature.");
    }
}
