//! Listener registry shared by channel sources and the engine output

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use log::warn;

use crate::types::Sample;

/// Receives stamped samples pushed by a channel source or the engine.
///
/// Implemented for every `FnMut(&Sample)` closure, so a listener can be a
/// plain closure or a struct that records what it sees.
pub trait SampleListener {
    fn on_sample(&mut self, sample: &Sample);
}

impl<F> SampleListener for F
where
    F: FnMut(&Sample),
{
    fn on_sample(&mut self, sample: &Sample) {
        self(sample)
    }
}

/// Listener handle held by a registry.
///
/// Two handles are the same listener when they point at the same
/// allocation. The handle is not `Send`: a registry and its listeners live
/// on one execution context.
///
/// # Example
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use gyro_linear_acceleration::{Sample, SharedListener};
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = seen.clone();
/// let listener: SharedListener = Rc::new(RefCell::new(move |sample: &Sample| {
///     sink.borrow_mut().push(sample.timestamp);
/// }));
/// # let _ = listener;
/// ```
pub type SharedListener = Rc<RefCell<dyn SampleListener>>;

/// Whether the owner entry stays registered after a delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Subscription {
    Keep,
    Cancel,
}

/// Registry entry
#[derive(Clone)]
pub(crate) enum Subscriber {
    /// The component owning the registry, fed through the closure passed
    /// to [`ListenerRegistry::dispatch`]
    Owner,
    Listener(SharedListener),
}

impl Subscriber {
    fn same_as(&self, other: &Subscriber) -> bool {
        match (self, other) {
            (Subscriber::Owner, Subscriber::Owner) => true,
            (Subscriber::Listener(a), Subscriber::Listener(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subscriber::Owner => write!(f, "Owner"),
            Subscriber::Listener(listener) => {
                write!(f, "Listener({:p})", Rc::as_ptr(listener) as *const ())
            }
        }
    }
}

/// Ordered set of subscribers; delivery follows registration order.
#[derive(Debug, Default)]
pub(crate) struct ListenerRegistry {
    subscribers: Vec<Subscriber>,
}

impl ListenerRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append a subscriber; returns `false` if it was already registered
    pub(crate) fn insert(&mut self, subscriber: Subscriber) -> bool {
        if self.contains(&subscriber) {
            return false;
        }
        self.subscribers.push(subscriber);
        true
    }

    /// Remove a subscriber; returns `false` if it was not registered
    pub(crate) fn remove(&mut self, subscriber: &Subscriber) -> bool {
        match self.subscribers.iter().position(|s| s.same_as(subscriber)) {
            Some(index) => {
                self.subscribers.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn contains(&self, subscriber: &Subscriber) -> bool {
        self.subscribers.iter().any(|s| s.same_as(subscriber))
    }

    pub(crate) fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Deliver `sample` to every subscriber in registration order.
    ///
    /// The owner entry is fed through `owner` and removed when it returns
    /// [`Subscription::Cancel`]. A listener that is already borrowed (a
    /// re-entrant delivery) is skipped rather than panicking.
    pub(crate) fn dispatch<F>(&mut self, sample: &Sample, mut owner: F)
    where
        F: FnMut(&Sample) -> Subscription,
    {
        self.subscribers.retain_mut(|subscriber| match subscriber {
            Subscriber::Owner => owner(sample) == Subscription::Keep,
            Subscriber::Listener(listener) => {
                match listener.try_borrow_mut() {
                    Ok(mut listener) => listener.on_sample(sample),
                    Err(_) => warn!(
                        "listener is busy, dropping sample at {} ns (re-entrant delivery)",
                        sample.timestamp
                    ),
                }
                true
            }
        });
    }

    /// Deliver `sample` to a registry that has no owner entry
    pub(crate) fn notify(&mut self, sample: &Sample) {
        self.dispatch(sample, |_| Subscription::Keep);
    }
}
