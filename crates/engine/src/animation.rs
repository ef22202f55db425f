//! Bounded, cancellable frame ticking for banner animations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

type Finish = Box<dyn FnOnce() + Send>;

/// Ticks a frame callback at a fixed interval for a bounded time.
#[derive(Debug, Clone, Copy)]
pub struct Animation {
    interval: Duration,
    max_duration: Duration,
}

/// Shortest frame interval; tokio timers reject a zero period.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

impl Animation {
    pub fn new(interval: Duration, max_duration: Duration) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
            max_duration,
        }
    }

    /// Starts ticking `frame` with the frame number.
    ///
    /// Ticking ends when `max_duration` elapses or the handle is stopped;
    /// `finish` then runs exactly once. Outside a tokio runtime no frame is
    /// drawn and `finish` runs on stop.
    pub fn start<F, D>(&self, mut frame: F, finish: D) -> AnimationHandle
    where
        F: FnMut(u64) + Send + 'static,
        D: FnOnce() + Send + 'static,
    {
        let handle = AnimationHandle::new(finish);

        let Ok(runtime) = Handle::try_current() else {
            return handle;
        };

        let inner = handle.inner.clone();
        let interval = self.interval;
        let max_duration = self.max_duration;

        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let deadline = tokio::time::sleep(max_duration);
            tokio::pin!(deadline);

            let mut n = 0u64;
            loop {
                tokio::select! {
                    _ = &mut deadline => break,
                    _ = ticker.tick() => {
                        if inner.stopped.load(Ordering::SeqCst) {
                            break;
                        }
                        frame(n);
                        n += 1;
                    }
                }
            }

            inner.finish();
        });

        if let Ok(mut slot) = handle.inner.task.lock() {
            *slot = Some(task);
        }
        handle
    }
}

impl Default for Animation {
    fn default() -> Self {
        Self::new(Duration::from_millis(80), Duration::from_secs(3))
    }
}

struct Inner {
    stopped: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
    finish: Mutex<Option<Finish>>,
}

impl Inner {
    fn finish(&self) {
        let finish = self.finish.lock().ok().and_then(|mut f| f.take());
        if let Some(finish) = finish {
            finish();
        }
    }
}

/// Stops a running animation. Cloned handles control the same animation.
#[derive(Clone)]
pub struct AnimationHandle {
    inner: Arc<Inner>,
}

impl AnimationHandle {
    fn new<D>(finish: D) -> Self
    where
        D: FnOnce() + Send + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                stopped: AtomicBool::new(false),
                task: Mutex::new(None),
                finish: Mutex::new(Some(Box::new(finish))),
            }),
        }
    }

    /// A handle with nothing behind it.
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    /// Stops ticking and runs the finish callback if it has not run yet.
    pub fn stop(&self) {
        if self.inner.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        let task = self.inner.task.lock().ok().and_then(|mut t| t.take());
        if let Some(task) = task {
            task.abort();
        }
        self.inner.finish();
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for AnimationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationHandle")
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counters() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        (Arc::new(AtomicUsize::new(0)), Arc::new(AtomicUsize::new(0)))
    }

    #[tokio::test]
    async fn test_ticks_until_deadline() {
        let (frames, finished) = counters();
        let (f, d) = (frames.clone(), finished.clone());

        let handle = Animation::new(Duration::from_millis(5), Duration::from_millis(40)).start(
            move |_| {
                f.fetch_add(1, Ordering::SeqCst);
            },
            move || {
                d.fetch_add(1, Ordering::SeqCst);
            },
        );

        tokio::time::sleep(Duration::from_millis(150)).await;
        let ticked = frames.load(Ordering::SeqCst);
        assert!(ticked > 0);
        assert_eq!(finished.load(Ordering::SeqCst), 1);

        // Past the deadline nothing ticks, and stopping does not finish twice.
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(frames.load(Ordering::SeqCst), ticked);
        handle.stop();
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let (frames, finished) = counters();
        let (f, d) = (frames.clone(), finished.clone());

        let handle = Animation::new(Duration::from_millis(5), Duration::from_secs(60)).start(
            move |_| {
                f.fetch_add(1, Ordering::SeqCst);
            },
            move || {
                d.fetch_add(1, Ordering::SeqCst);
            },
        );

        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.stop();
        handle.clone().stop();
        assert!(handle.is_stopped());
        assert_eq!(finished.load(Ordering::SeqCst), 1);

        let ticked = frames.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(frames.load(Ordering::SeqCst), ticked);
    }

    #[tokio::test]
    async fn test_zero_interval_still_ticks_and_finishes() {
        let (frames, finished) = counters();
        let (f, d) = (frames.clone(), finished.clone());

        let _handle = Animation::new(Duration::ZERO, Duration::from_millis(30)).start(
            move |_| {
                f.fetch_add(1, Ordering::SeqCst);
            },
            move || {
                d.fetch_add(1, Ordering::SeqCst);
            },
        );

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(frames.load(Ordering::SeqCst) > 0);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_without_runtime_finishes_on_stop() {
        let finished = Arc::new(AtomicUsize::new(0));
        let d = finished.clone();

        let handle = Animation::default().start(|_| {}, move || {
            d.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(finished.load(Ordering::SeqCst), 0);

        handle.stop();
        handle.stop();
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }
}
