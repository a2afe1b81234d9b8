//! Cancellable handle to an in-flight request.
//!
//! # Design
//! Each execution spawns one Tokio task (the worker) that drives the
//! transport future. The handle and the worker share a `watch` channel
//! holding the lifecycle `State`; the handle writes control transitions
//! (suspend, resume, cancel) and the worker reacts to them. The outcome is
//! delivered once through a `oneshot` channel, and the handle itself is the
//! future that resolves to it.
//!
//! Suspending stops polling the transport future, which pauses the exchange
//! without dropping it. Cancelling drops it. Either way the worker marks the
//! state `Completed` before delivering the outcome.

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll};

use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

use crate::decode::{decode_transport_error, Outcome};
use crate::error::{RequestError, TransportError, NO_STATUS};
use crate::http::{HttpRequest, HttpResponse, ResponseHead};
use crate::json::KeyPath;
use crate::transport::{Transport, TransportFuture};

/// Lifecycle of an execution.
///
/// `Running` is initial. `Suspended` and `Running` alternate until the
/// request finishes or is cancelled; `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Running,
    Suspended,
    Cancelling,
    Completed,
}

/// Turns a raw response into the typed outcome for one handle.
pub(crate) type Adapter<T> = fn(&HttpResponse, Option<&KeyPath>) -> Outcome<T>;

struct Shared {
    state: watch::Sender<State>,
    response: OnceLock<ResponseHead>,
}

/// Caller-side view of one request execution.
///
/// Await the handle to receive its outcome. Control methods are
/// fire-and-forget: the awaited outcome is the only authoritative signal of
/// how the request ended.
pub struct Handle<T> {
    shared: Arc<Shared>,
    original: Arc<HttpRequest>,
    key_path: Option<KeyPath>,
    completion: oneshot::Receiver<Outcome<T>>,
}

impl<T: Send + 'static> Handle<T> {
    /// Start executing `request` on the current Tokio runtime.
    ///
    /// Outside a runtime nothing is sent and the handle resolves at once to
    /// a `network_error`.
    pub(crate) fn spawn(
        transport: Arc<dyn Transport>,
        request: HttpRequest,
        key_path: Option<KeyPath>,
        adapter: Adapter<T>,
    ) -> Self {
        let (state, _) = watch::channel(State::Running);
        let shared = Arc::new(Shared {
            state,
            response: OnceLock::new(),
        });
        let original = Arc::new(request);
        let (sender, completion) = oneshot::channel();

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let worker = Worker {
                    shared: Arc::clone(&shared),
                    request: Arc::clone(&original),
                    key_path: key_path.clone(),
                    transport,
                    adapter,
                };
                runtime.spawn(worker.run(sender));
            }
            Err(err) => {
                warn!(url = %original.url, "no Tokio runtime to execute on");
                let err = TransportError::Other(format!("no async runtime: {err}"));
                shared.state.send_replace(State::Completed);
                let _ = sender.send(Err(RequestError::network(NO_STATUS, &err)));
            }
        }

        Self {
            shared,
            original,
            key_path,
            completion,
        }
    }
}

impl<T> Handle<T> {
    pub fn state(&self) -> State {
        *self.shared.state.borrow()
    }

    /// Request cancellation. No effect once the request has completed.
    pub fn cancel(&self) {
        self.shared.state.send_if_modified(|state| match state {
            State::Running | State::Suspended => {
                *state = State::Cancelling;
                true
            }
            State::Cancelling | State::Completed => false,
        });
    }

    /// Pause a running request.
    pub fn suspend(&self) {
        self.transition(State::Running, State::Suspended);
    }

    /// Continue a suspended request.
    pub fn resume(&self) {
        self.transition(State::Suspended, State::Running);
    }

    fn transition(&self, from: State, to: State) {
        self.shared.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        });
    }

    pub fn key_path(&self) -> Option<&KeyPath> {
        self.key_path.as_ref()
    }

    /// The request as it was built.
    pub fn original_request(&self) -> &HttpRequest {
        &self.original
    }

    /// The request as last sent: the original, pointed at the final URL once
    /// the transport has followed redirects.
    pub fn current_request(&self) -> Cow<'_, HttpRequest> {
        match self.shared.response.get() {
            Some(head) if head.url != self.original.url => {
                let mut request = HttpRequest::clone(&self.original);
                request.url = head.url.clone();
                Cow::Owned(request)
            }
            _ => Cow::Borrowed(&self.original),
        }
    }

    /// Status and headers, once a response has arrived.
    pub fn response(&self) -> Option<&ResponseHead> {
        self.shared.response.get()
    }
}

impl<T> Future for Handle<T> {
    type Output = Outcome<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A dropped sender means the worker never finished, e.g. the runtime
        // shut down underneath it.
        Pin::new(&mut self.completion)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(RequestError::cancelled())))
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("state", &self.state())
            .field("method", &self.original.method)
            .field("url", &self.original.url.as_str())
            .field("key_path", &self.key_path)
            .finish()
    }
}

struct Worker<T> {
    shared: Arc<Shared>,
    request: Arc<HttpRequest>,
    key_path: Option<KeyPath>,
    transport: Arc<dyn Transport>,
    adapter: Adapter<T>,
}

impl<T: Send + 'static> Worker<T> {
    async fn run(self, completion: oneshot::Sender<Outcome<T>>) {
        let outcome = match self.drive().await {
            Some(Ok(response)) => {
                debug!(status = response.status, url = %response.url, "response received");
                // Set once, by this worker only.
                let _ = self.shared.response.set(response.head());
                (self.adapter)(&response, self.key_path.as_ref())
            }
            Some(Err(err)) => Err(decode_transport_error(&err)),
            None => {
                info!(url = %self.request.url, "request cancelled");
                Err(RequestError::cancelled())
            }
        };

        self.shared.state.send_replace(State::Completed);
        // The caller may have dropped the handle; the outcome is then unobserved.
        let _ = completion.send(outcome);
    }

    /// Poll the transport while running. `None` means cancelled.
    async fn drive(&self) -> Option<Result<HttpResponse, TransportError>> {
        let mut state = self.shared.state.subscribe();
        // Created on first run so a request suspended before it starts never
        // reaches the transport.
        let mut exchange: Option<TransportFuture<'_>> = None;
        loop {
            let current = *state.borrow_and_update();
            match current {
                State::Running => {
                    let exchange = exchange
                        .get_or_insert_with(|| self.transport.execute(&self.request));
                    tokio::select! {
                        result = exchange => return Some(result),
                        changed = state.changed() => {
                            if changed.is_err() {
                                return None;
                            }
                        }
                    }
                }
                State::Suspended => {
                    if state.changed().await.is_err() {
                        return None;
                    }
                }
                State::Cancelling | State::Completed => return None,
            }
        }
    }
}
