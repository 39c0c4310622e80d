//! Resilient loading of a heavy, optional component.
//!
//! A [`ResilientLoader`] loads a component on demand with a timeout and a
//! bounded number of consecutive failures:
//!
//! ```text
//! Idle ──start_load──▶ Loading ──ok──▶ Ready
//!                        │
//!                        └─err/timeout─▶ Failed ──start_load──▶ Loading
//!                                          │
//!                          attempts > ceiling
//!                                          ▼
//!                                       Degraded ──reset──▶ Idle
//! ```
//!
//! Once degraded the loader stops loading and callers fall back to
//! [`LocationPicker::Manual`] until the user resets it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::LoadError;

/// Default bound on a single load.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of consecutive failures tolerated before degrading.
pub const DEFAULT_CEILING: u32 = 3;

/// A loaded component.
pub trait Component: Send + Sync + 'static {
    /// Capabilities the caller needs that this component lacks. A
    /// non-empty answer fails the load as [`LoadError::Incompatible`].
    fn missing_capabilities(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Where components come from.
#[async_trait]
pub trait ComponentSource: Send + Sync + 'static {
    type Component: Component;

    async fn load(&self) -> Result<Self::Component, LoadError>;
}

/// Observable loader state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed(LoadError),
    /// Too many consecutive failures. Sticky until [`ResilientLoader::reset`].
    Degraded(LoadError),
}

impl LoadState {
    pub fn label(&self) -> &'static str {
        match self {
            LoadState::Idle => "idle",
            LoadState::Loading => "loading",
            LoadState::Ready => "ready",
            LoadState::Failed(_) => "failed",
            LoadState::Degraded(_) => "degraded",
        }
    }

    pub fn error(&self) -> Option<&LoadError> {
        match self {
            LoadState::Failed(err) | LoadState::Degraded(err) => Some(err),
            _ => None,
        }
    }
}

/// How the caller should let the user choose a location.
#[derive(Debug)]
pub enum LocationPicker<C> {
    /// The component is loaded; use it.
    Interactive(Arc<C>),
    /// Nothing loaded yet, or a load is in flight.
    Pending,
    /// The last load failed and another attempt is allowed.
    Retry { attempts: u32, error: LoadError },
    /// Loading gave up; accept typed coordinates instead.
    Manual { reason: LoadError },
}

impl<C> LocationPicker<C> {
    pub fn is_manual(&self) -> bool {
        matches!(self, LocationPicker::Manual { .. })
    }
}

struct Slot<C> {
    state: LoadState,
    attempts: u32,
    generation: u64,
    component: Option<Arc<C>>,
}

struct Inner<S: ComponentSource> {
    source: S,
    timeout: Duration,
    ceiling: u32,
    slot: Mutex<Slot<S::Component>>,
}

/// Loads a component with a timeout and a failure ceiling.
///
/// Clones share the same state.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use hearthlog_sync::{Component, ComponentSource, LoadError, LoadState, ResilientLoader};
///
/// struct Tiles;
/// impl Component for Tiles {}
///
/// struct Builtin;
///
/// #[async_trait]
/// impl ComponentSource for Builtin {
///     type Component = Tiles;
///     async fn load(&self) -> Result<Tiles, LoadError> {
///         Ok(Tiles)
///     }
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let loader = ResilientLoader::new(Builtin);
///     assert_eq!(loader.start_load().await, LoadState::Ready);
///     assert!(loader.component().is_some());
/// }
/// ```
pub struct ResilientLoader<S: ComponentSource> {
    inner: Arc<Inner<S>>,
}

impl<S: ComponentSource> Clone for ResilientLoader<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: ComponentSource> ResilientLoader<S> {
    /// A loader with the default timeout and ceiling.
    pub fn new(source: S) -> Self {
        Self::builder(source).build()
    }

    pub fn builder(source: S) -> ResilientLoaderBuilder<S> {
        ResilientLoaderBuilder::new(source)
    }

    pub fn state(&self) -> LoadState {
        self.inner.slot.lock().state.clone()
    }

    /// Consecutive failed attempts.
    pub fn attempts(&self) -> u32 {
        self.inner.slot.lock().attempts
    }

    pub fn ceiling(&self) -> u32 {
        self.inner.ceiling
    }

    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// The cached component, once loaded.
    pub fn component(&self) -> Option<Arc<S::Component>> {
        self.inner.slot.lock().component.clone()
    }

    /// Load the component if that is allowed, and wait for the outcome.
    ///
    /// No-op returning the current state while `Loading`, `Ready` or
    /// `Degraded`. Otherwise the load races the timeout in a background
    /// task, so the attempt settles even if this future is dropped. A
    /// timeout counts as a failed attempt and cancels the load.
    pub async fn start_load(&self) -> LoadState {
        let ticket = {
            let mut slot = self.inner.slot.lock();
            match slot.state {
                LoadState::Loading | LoadState::Ready | LoadState::Degraded(_) => {
                    return slot.state.clone();
                }
                LoadState::Idle | LoadState::Failed(_) => {}
            }
            slot.generation += 1;
            slot.state = LoadState::Loading;
            info!(attempt = slot.attempts + 1, "loading component");
            slot.generation
        };

        let loader = self.clone();
        let load = tokio::spawn(async move {
            loader
                .inner
                .source
                .load()
                .await
                .and_then(check_capabilities)
                .map(Arc::new)
        });

        // Settles the ticket even if this caller is dropped.
        let loader = self.clone();
        let timeout = self.inner.timeout;
        let watchdog = tokio::spawn(async move {
            let mut load = load;
            let result = match tokio::time::timeout(timeout, &mut load).await {
                Ok(Ok(result)) => result,
                Ok(Err(join_err)) => Err(LoadError::Failed(format!(
                    "load task failed: {}",
                    join_err
                ))),
                Err(_) => {
                    load.abort();
                    Err(LoadError::Timeout(timeout))
                }
            };
            loader.settle(ticket, result);
        });

        if let Err(err) = watchdog.await {
            warn!(%err, "load watchdog did not finish");
        }
        self.state()
    }

    /// [`start_load`](Self::start_load) in the background.
    pub fn spawn_load(&self) -> JoinHandle<LoadState> {
        let loader = self.clone();
        tokio::spawn(async move { loader.start_load().await })
    }

    /// Forget every failure and the cached component, and return to `Idle`.
    ///
    /// Any load still in flight is discarded when it settles.
    pub fn reset(&self) {
        let mut slot = self.inner.slot.lock();
        slot.generation += 1;
        slot.attempts = 0;
        slot.component = None;
        slot.state = LoadState::Idle;
        info!("component loader reset");
    }

    /// [`reset`](Self::reset), then load.
    pub async fn retry_from_scratch(&self) -> LoadState {
        self.reset();
        self.start_load().await
    }

    /// The picker the caller should present right now.
    pub fn picker(&self) -> LocationPicker<S::Component> {
        let slot = self.inner.slot.lock();
        match (&slot.state, &slot.component) {
            (LoadState::Ready, Some(component)) => LocationPicker::Interactive(component.clone()),
            (LoadState::Failed(error), _) => LocationPicker::Retry {
                attempts: slot.attempts,
                error: error.clone(),
            },
            (LoadState::Degraded(error), _) => LocationPicker::Manual {
                reason: error.clone(),
            },
            _ => LocationPicker::Pending,
        }
    }

    /// Apply the first result for the current ticket. Returns whether it applied.
    fn settle(&self, ticket: u64, result: Result<Arc<S::Component>, LoadError>) -> bool {
        let mut slot = self.inner.slot.lock();
        if slot.generation != ticket || slot.state != LoadState::Loading {
            debug!(ticket, current = slot.generation, "discarding stale load result");
            return false;
        }

        match result {
            Ok(component) => {
                slot.attempts = 0;
                slot.component = Some(component);
                slot.state = LoadState::Ready;
                info!("component ready");
            }
            Err(error) => {
                slot.attempts += 1;
                warn!(attempts = slot.attempts, ceiling = self.inner.ceiling, %error, "component load failed");
                slot.state = if slot.attempts > self.inner.ceiling {
                    info!("giving up on component; falling back");
                    LoadState::Degraded(error)
                } else {
                    LoadState::Failed(error)
                };
            }
        }
        true
    }
}

impl<S: ComponentSource> std::fmt::Debug for ResilientLoader<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.inner.slot.lock();
        f.debug_struct("ResilientLoader")
            .field("state", &slot.state)
            .field("attempts", &slot.attempts)
            .field("ceiling", &self.inner.ceiling)
            .field("timeout", &self.inner.timeout)
            .finish()
    }
}

fn check_capabilities<C: Component>(component: C) -> Result<C, LoadError> {
    let missing = component.missing_capabilities();
    if missing.is_empty() {
        Ok(component)
    } else {
        Err(LoadError::Incompatible { missing })
    }
}

/// Builder for configuring a ResilientLoader.
pub struct ResilientLoaderBuilder<S> {
    source: S,
    timeout: Option<Duration>,
    ceiling: Option<u32>,
}

impl<S: ComponentSource> ResilientLoaderBuilder<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            timeout: None,
            ceiling: None,
        }
    }

    /// Bound on a single load (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Consecutive failures tolerated before degrading (default: 3).
    pub fn ceiling(mut self, ceiling: u32) -> Self {
        self.ceiling = Some(ceiling);
        self
    }

    pub fn build(self) -> ResilientLoader<S> {
        ResilientLoader {
            inner: Arc::new(Inner {
                source: self.source,
                timeout: self.timeout.unwrap_or(DEFAULT_LOAD_TIMEOUT),
                ceiling: self.ceiling.unwrap_or(DEFAULT_CEILING),
                slot: Mutex::new(Slot {
                    state: LoadState::Idle,
                    attempts: 0,
                    generation: 0,
                    component: None,
                }),
            }),
        }
    }
}
