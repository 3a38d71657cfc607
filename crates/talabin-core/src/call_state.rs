// ── Call-state tracker ──
//
// Wraps any envelope-returning call with `{data, loading, error}` state for
// a view to render. State lives in a `watch` channel so observers are pushed
// every change. Each execution is tagged with the tracker's generation;
// `reset` and `release` advance it, and results from an older generation
// are dropped without touching state or firing callbacks.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::FutureExt as _;
use futures_util::future::BoxFuture;
use talabin_api::{ApiError, ErrorKind, ResponseEnvelope};
use tokio::sync::watch;
use tokio_stream::Stream;
use tokio_stream::StreamExt as _;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, warn};

/// What a view renders.
#[derive(Debug, Clone, PartialEq)]
pub struct CallState<T> {
    /// Result of the last successful call; kept while a new call loads
    /// and when a later call fails.
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for CallState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

#[derive(Clone)]
struct Slot<T> {
    state: CallState<T>,
    generation: u64,
    in_flight: usize,
}

type CallFn<T, A> = dyn Fn(A) -> BoxFuture<'static, ResponseEnvelope<T>> + Send + Sync;
type SuccessFn<T> = dyn Fn(&T) + Send + Sync;
type ErrorFn = dyn Fn(&str) + Send + Sync;

/// Behaviour switches for an [`ApiCall`].
pub struct CallOptions<T> {
    immediate: bool,
    on_success: Option<Arc<SuccessFn<T>>>,
    on_error: Option<Arc<ErrorFn>>,
}

impl<T> Default for CallOptions<T> {
    fn default() -> Self {
        Self {
            immediate: false,
            on_success: None,
            on_error: None,
        }
    }
}

impl<T> CallOptions<T> {
    /// Run once with default arguments on [`ApiCall::activate`].
    pub fn immediate(mut self) -> Self {
        self.immediate = true;
        self
    }

    pub fn on_success(mut self, f: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }
}

struct CallInner<T, A> {
    call: Box<CallFn<T, A>>,
    options: CallOptions<T>,
    slot: watch::Sender<Slot<T>>,
    activated: AtomicBool,
}

/// Stateful wrapper around one kind of API call. Cheap to clone; clones
/// share state.
///
/// Overlapping executions are allowed. Whichever settles last determines
/// the visible `data`/`error`, and `loading` stays set until every
/// execution of the current generation has settled.
pub struct ApiCall<T, A = ()> {
    inner: Arc<CallInner<T, A>>,
}

impl<T, A> Clone for ApiCall<T, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, A> ApiCall<T, A>
where
    T: Clone + Send + Sync + 'static,
    A: Send + 'static,
{
    pub fn new<F, Fut>(call: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResponseEnvelope<T>> + Send + 'static,
    {
        Self::with_options(call, CallOptions::default())
    }

    pub fn with_options<F, Fut>(call: F, options: CallOptions<T>) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResponseEnvelope<T>> + Send + 'static,
    {
        let (slot, _) = watch::channel(Slot {
            state: CallState::default(),
            generation: 0,
            in_flight: 0,
        });
        Self {
            inner: Arc::new(CallInner {
                call: Box::new(move |args| call(args).boxed()),
                options,
                slot,
                activated: AtomicBool::new(false),
            }),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> CallState<T> {
        self.inner.slot.borrow().state.clone()
    }

    pub fn subscribe(&self) -> CallStateStream<T> {
        CallStateStream {
            rx: self.inner.slot.subscribe(),
        }
    }

    /// Run the call and fold its outcome into state.
    ///
    /// Returns the envelope the call produced. A panicking call settles as
    /// a network failure. If the tracker was reset or released while the
    /// call was in flight, state and callbacks are left alone.
    pub async fn execute(&self, args: A) -> ResponseEnvelope<T> {
        let mut generation = 0;
        self.inner.slot.send_modify(|slot| {
            generation = slot.generation;
            slot.in_flight += 1;
            slot.state.loading = true;
            slot.state.error = None;
        });

        let pending = async { (self.inner.call)(args).await };
        let envelope = match AssertUnwindSafe(pending).catch_unwind().await {
            Ok(envelope) => envelope,
            Err(_) => {
                warn!("API call panicked; reporting as network failure");
                ResponseEnvelope::failure(ApiError::from_kind(ErrorKind::Network))
            }
        };

        let failure_message = envelope.error_message();
        let mut current = false;
        self.inner.slot.send_if_modified(|slot| {
            if slot.generation != generation {
                return false;
            }
            current = true;
            slot.in_flight = slot.in_flight.saturating_sub(1);
            slot.state.loading = slot.in_flight > 0;
            match (envelope.data(), &failure_message) {
                (Some(data), _) => slot.state.data = Some(data.clone()),
                (None, message) => slot.state.error.clone_from(message),
            }
            true
        });

        if !current {
            debug!(generation, "dropping result from a previous generation");
            return envelope;
        }

        match (envelope.data(), &failure_message) {
            (Some(data), _) => {
                if let Some(on_success) = &self.inner.options.on_success {
                    on_success(data);
                }
            }
            (None, message) => {
                if let (Some(on_error), Some(message)) = (&self.inner.options.on_error, message) {
                    on_error(message.as_str());
                }
            }
        }
        envelope
    }

    /// Back to `{data: None, loading: false, error: None}`. In-flight
    /// executions become stale.
    pub fn reset(&self) {
        self.inner.slot.send_modify(|slot| {
            slot.generation += 1;
            slot.in_flight = 0;
            slot.state = CallState::default();
        });
    }

    /// Teardown: in-flight executions become stale and a later
    /// [`activate`](Self::activate) fires again. State is kept.
    pub fn release(&self) {
        self.inner.slot.send_if_modified(|slot| {
            slot.generation += 1;
            slot.in_flight = 0;
            let was_loading = slot.state.loading;
            slot.state.loading = false;
            was_loading
        });
        self.inner.activated.store(false, Ordering::SeqCst);
    }
}

impl<T, A> ApiCall<T, A>
where
    T: Clone + Send + Sync + 'static,
    A: Default + Send + 'static,
{
    /// Mount hook: in immediate mode, runs `execute(A::default())` the
    /// first time it is called per activation. Returns `None` when nothing
    /// ran.
    pub async fn activate(&self) -> Option<ResponseEnvelope<T>> {
        if !self.inner.options.immediate || self.inner.activated.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(self.execute(A::default()).await)
    }
}

/// Push-based view of an [`ApiCall`]'s state.
pub struct CallStateStream<T> {
    rx: watch::Receiver<Slot<T>>,
}

impl<T: Clone + Send + Sync + 'static> CallStateStream<T> {
    pub fn current(&self) -> CallState<T> {
        self.rx.borrow().state.clone()
    }

    /// Wait for the next change. `None` once the tracker is dropped.
    pub async fn changed(&mut self) -> Option<CallState<T>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().state.clone())
    }

    pub fn into_stream(self) -> impl Stream<Item = CallState<T>> {
        WatchStream::new(self.rx).map(|slot| slot.state)
    }
}
