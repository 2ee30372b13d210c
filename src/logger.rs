//! Where middleware and responders send their events.
//!
//! A [`Logger`] is a handle to a `tracing` dispatcher. Components emit their
//! events inside [`tracing::dispatcher::with_default`] so an explicitly
//! configured logger wins over whatever subscriber the calling thread has.
//!
//! When no logger is configured, components fall back to
//! [`Logger::current`], resolved once when the component is built. Outside
//! any scoped default that is the global subscriber installed by
//! `tracing_subscriber::fmt::init()`.
//!
//! If nothing is installed yet at that point, the logger stays unbound and
//! emits on whatever dispatcher is current when the event fires. A handler
//! built before `main` sets up logging still gets its events out.

use tracing::subscriber::NoSubscriber;
use tracing::{Dispatch, Subscriber};

/// A cloneable handle to a `tracing` subscriber.
#[derive(Clone, Debug)]
pub struct Logger {
    // `None` means "whatever is current at event time".
    dispatch: Option<Dispatch>,
}

impl Logger {
    /// Sends events to `subscriber` only.
    pub fn new<S>(subscriber: S) -> Self
    where
        S: Subscriber + Send + Sync + 'static,
    {
        Self { dispatch: Some(Dispatch::new(subscriber)) }
    }

    /// Captures the dispatcher that is current on this thread right now.
    ///
    /// The no-op dispatcher is not captured; see the module docs.
    pub fn current() -> Self {
        tracing::dispatcher::get_default(|dispatch| Self::from(dispatch.clone()))
    }

    /// Whether events go to a fixed dispatcher rather than the ambient one.
    pub fn is_bound(&self) -> bool {
        self.dispatch.is_some()
    }

    /// Runs `f` with this logger as the default dispatcher.
    pub(crate) fn scope<T>(&self, f: impl FnOnce() -> T) -> T {
        match &self.dispatch {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, f),
            None => f(),
        }
    }

    /// Resolves an optional logger against the current default.
    pub(crate) fn or_current(logger: Option<Self>) -> Self {
        logger.unwrap_or_else(Self::current)
    }
}

impl From<Dispatch> for Logger {
    fn from(dispatch: Dispatch) -> Self {
        if dispatch.is::<NoSubscriber>() {
            return Self { dispatch: None };
        }
        Self { dispatch: Some(dispatch) }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tracing::span::{Attributes, Id, Record};
    use tracing::{Event, Metadata};

    use super::*;

    /// Counts events; everything else is a no-op.
    #[derive(Clone, Default)]
    struct Counter(Arc<AtomicUsize>);

    impl Counter {
        fn count(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    impl Subscriber for Counter {
        fn enabled(&self, _: &Metadata<'_>) -> bool {
            true
        }

        fn new_span(&self, _: &Attributes<'_>) -> Id {
            Id::from_u64(1)
        }

        fn record(&self, _: &Id, _: &Record<'_>) {}

        fn record_follows_from(&self, _: &Id, _: &Id) {}

        fn event(&self, _: &Event<'_>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        fn enter(&self, _: &Id) {}

        fn exit(&self, _: &Id) {}
    }

    #[test]
    fn explicit_logger_receives_scoped_events() {
        let counter = Counter::default();
        let logger = Logger::new(counter.clone());

        logger.scope(|| tracing::info!("one"));
        tracing::info!("not routed through the logger");

        assert_eq!(counter.count(), 1);
    }

    #[test]
    fn fallback_is_resolved_at_construction() {
        let counter = Counter::default();
        let logger = tracing::subscriber::with_default(counter.clone(), || Logger::or_current(None));

        // The scoped default is gone, but the logger still points at it.
        logger.scope(|| tracing::error!("late event"));

        assert!(logger.is_bound());
        assert_eq!(counter.count(), 1);
    }

    #[test]
    fn nothing_installed_means_ambient_at_event_time() {
        let early = tracing::dispatcher::with_default(&Dispatch::none(), Logger::current);
        assert!(!early.is_bound());

        let counter = Counter::default();
        tracing::subscriber::with_default(counter.clone(), || {
            early.scope(|| tracing::error!("installed after construction"));
        });

        assert_eq!(counter.count(), 1);
    }

    #[test]
    fn dispatch_conversion_binds_real_subscribers_only() {
        let counter = Counter::default();
        let logger = Logger::from(Dispatch::new(counter.clone()));
        assert!(logger.is_bound());
        logger.scope(|| tracing::info!("routed"));
        assert_eq!(counter.count(), 1);

        assert!(!Logger::from(Dispatch::none()).is_bound());
    }
}
