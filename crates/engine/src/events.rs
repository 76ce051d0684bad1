use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

/// An event carried by an [`EventBus`]. Subscriptions are keyed by the event's kind.
pub trait BusEvent {
    type Kind: Copy + Eq + Hash + fmt::Debug;

    fn kind(&self) -> Self::Kind;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Handler<E> = Rc<dyn Fn(&E)>;

struct Subscription<E: BusEvent> {
    id: SubscriptionId,
    kind: E::Kind,
    handler: Handler<E>,
    once: Option<Rc<Cell<bool>>>,
}

impl<E: BusEvent> Clone for Subscription<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            kind: self.kind,
            handler: Rc::clone(&self.handler),
            once: self.once.clone(),
        }
    }
}

struct BusState<E: BusEvent> {
    next_id: u64,
    subscriptions: Vec<Subscription<E>>,
}

/// Synchronous single-threaded publish/subscribe channel.
///
/// Handlers run in subscription order inside `emit`. The handler list is snapshotted per
/// emit, so a handler may subscribe, unsubscribe or emit further events re-entrantly;
/// nested emits are fully dispatched before the outer emit continues. Handler panics are
/// not caught.
///
/// Cloning yields another handle to the same bus.
pub struct EventBus<E: BusEvent> {
    state: Rc<RefCell<BusState<E>>>,
}

impl<E: BusEvent> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<E: BusEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: BusEvent> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.state.borrow().subscriptions.len())
            .finish()
    }
}

impl<E: BusEvent> EventBus<E> {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(BusState {
                next_id: 0,
                subscriptions: Vec::new(),
            })),
        }
    }

    pub fn on(&self, kind: E::Kind, handler: impl Fn(&E) + 'static) -> SubscriptionId {
        self.subscribe(kind, Rc::new(handler), None)
    }

    /// Subscribes a handler that is removed right before its first invocation.
    pub fn once(&self, kind: E::Kind, handler: impl Fn(&E) + 'static) -> SubscriptionId {
        self.subscribe(kind, Rc::new(handler), Some(Rc::new(Cell::new(false))))
    }

    /// Removes a subscription. Returns `false` when it was already gone.
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut state = self.state.borrow_mut();
        let before = state.subscriptions.len();
        state.subscriptions.retain(|sub| sub.id != id);
        state.subscriptions.len() != before
    }

    pub fn listener_count(&self, kind: E::Kind) -> usize {
        self.state
            .borrow()
            .subscriptions
            .iter()
            .filter(|sub| sub.kind == kind)
            .count()
    }

    pub fn emit(&self, event: &E) {
        let kind = event.kind();
        let snapshot: Vec<Subscription<E>> = self
            .state
            .borrow()
            .subscriptions
            .iter()
            .filter(|sub| sub.kind == kind)
            .cloned()
            .collect();

        for subscription in snapshot {
            if let Some(fired) = &subscription.once {
                if fired.replace(true) {
                    continue;
                }
                self.off(subscription.id);
            }
            (subscription.handler)(event);
        }
    }

    fn subscribe(
        &self,
        kind: E::Kind,
        handler: Handler<E>,
        once: Option<Rc<Cell<bool>>>,
    ) -> SubscriptionId {
        let mut state = self.state.borrow_mut();
        let id = SubscriptionId(state.next_id);
        state.next_id = state.next_id.saturating_add(1);
        state.subscriptions.push(Subscription {
            id,
            kind,
            handler,
            once,
        });
        id
    }
}

/// Fire-and-forget delayed payloads, released by [`TimerQueue::advance`] once due.
#[derive(Debug, Clone)]
pub struct TimerQueue<T> {
    now_seconds: f64,
    next_seq: u64,
    pending: Vec<PendingTimer<T>>,
}

#[derive(Debug, Clone)]
struct PendingTimer<T> {
    due_seconds: f64,
    seq: u64,
    payload: T,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            now_seconds: 0.0,
            next_seq: 0,
            pending: Vec::new(),
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, after_seconds: f32, payload: T) {
        let delay = if after_seconds.is_finite() {
            f64::from(after_seconds.max(0.0))
        } else {
            0.0
        };
        self.pending.push(PendingTimer {
            due_seconds: self.now_seconds + delay,
            seq: self.next_seq,
            payload,
        });
        self.next_seq = self.next_seq.saturating_add(1);
    }

    /// Advances the clock and returns every payload now due, earliest first.
    ///
    /// Payloads scheduled while the returned batch is handled wait for the next call,
    /// even with a zero delay.
    pub fn advance(&mut self, dt_seconds: f32) -> Vec<T> {
        if dt_seconds.is_finite() && dt_seconds > 0.0 {
            self.now_seconds += f64::from(dt_seconds);
        }
        let now = self.now_seconds;
        let (mut due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|timer| timer.due_seconds <= now);
        self.pending = pending;
        due.sort_by(|a, b| {
            a.due_seconds
                .total_cmp(&b.due_seconds)
                .then(a.seq.cmp(&b.seq))
        });
        due.into_iter().map(|timer| timer.payload).collect()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
