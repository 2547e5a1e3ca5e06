//! Queued external events for collaborators outside the simulation.
//!
//! This is the second flavor of the engine's event bus. Where system events
//! fan out synchronously to other systems on the same call stack, external
//! events are enqueue-now, dispatch-later: anything raised during a tick is
//! buffered and delivered only after every system has finished, so a
//! subscriber (a presentation layer, a replay recorder, a network relay)
//! can never reenter the simulation mid-tick.
//!
//! Subscribers attach per event type and receive an explicit
//! [`SubscriptionId`] handle; detaching uses the handle, never callback
//! identity. Zero subscribers for a queued event is not an error — this
//! channel is fire-and-forget by design.

use std::any::{type_name, Any, TypeId};
use std::collections::{HashMap, VecDeque};

use log::debug;


/// Handle returned by a subscription, used later to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct QueuedEvent {
    type_id: TypeId,
    name: &'static str,
    payload: Box<dyn Any>,
}

struct Subscriber {
    id: SubscriptionId,
    deliver: Box<dyn FnMut(&dyn Any)>,
}

/// The queued external-event channel: a FIFO of type-erased payloads plus
/// per-type subscriber lists in subscription order.
pub(crate) struct ExternalEvents {
    queue: VecDeque<QueuedEvent>,
    subscribers: HashMap<TypeId, Vec<Subscriber>>,
    next_id: u64,
}

impl ExternalEvents {
    pub(crate) fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            subscribers: HashMap::new(),
            next_id: 0,
        }
    }

    /// Attaches a callback for events of type `E`, returning its handle.
    pub(crate) fn subscribe<E: 'static>(
        &mut self,
        mut callback: impl FnMut(&E) + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;

        let deliver: Box<dyn FnMut(&dyn Any)> = Box::new(move |payload| {
            if let Some(event) = payload.downcast_ref::<E>() {
                callback(event);
            }
        });

        self.subscribers
            .entry(TypeId::of::<E>())
            .or_default()
            .push(Subscriber { id, deliver });
        id
    }

    /// Detaches a previously attached callback. Returns `false` if the
    /// handle is unknown (already unsubscribed, or never issued).
    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        for subscribers in self.subscribers.values_mut() {
            if let Some(position) = subscribers.iter().position(|s| s.id == id) {
                subscribers.remove(position);
                return true;
            }
        }
        false
    }

    /// Buffers an event for delivery at the end of the current tick.
    pub(crate) fn enqueue<E: 'static>(&mut self, event: E) {
        self.queue.push_back(QueuedEvent {
            type_id: TypeId::of::<E>(),
            name: type_name::<E>(),
            payload: Box::new(event),
        });
    }

    /// Delivers every buffered event, in queue order, to its type's
    /// subscribers in subscription order.
    pub(crate) fn drain(&mut self) {
        while let Some(event) = self.queue.pop_front() {
            let delivered = match self.subscribers.get_mut(&event.type_id) {
                Some(subscribers) => {
                    for subscriber in subscribers.iter_mut() {
                        (subscriber.deliver)(event.payload.as_ref());
                    }
                    subscribers.len()
                }
                None => 0,
            };
            debug!("external event {} delivered to {} subscriber(s)", event.name, delivered);
        }
    }
}
