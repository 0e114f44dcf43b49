use std::any::Any;
use std::fmt;

use super::listener::ListenerId;

/// Which listeners an [`Event`] reaches.
///
/// Exactly one of these is meaningful for a given event, chosen at
/// construction and immutable afterwards.
#[derive(Debug, Clone)]
pub(crate) enum Target {
    /// Broadcast to every listener subscribed to this type string.
    Type(String),
    /// Delivered only to the listener with this id.
    Listener(ListenerId),
}

/// An event fired through an [`EventManager`](crate::EventManager).
///
/// `Event` is intentionally not generic: listeners know the concrete payload
/// type they registered for and recover it with [`Event::downcast_ref`]
/// rather than the manager being parameterized over one payload type.
pub struct Event {
    pub(crate) target: Target,
    payload: Box<dyn Any + Send + Sync>,
}

impl Event {
    /// Creates an event broadcast to every listener subscribed to `event_type`.
    pub fn with_type(event_type: impl Into<String>, payload: impl Any + Send + Sync) -> Self {
        Self {
            target: Target::Type(event_type.into()),
            payload: Box::new(payload),
        }
    }

    /// Creates an event delivered only to the listener registered under `id`.
    pub fn targeted(id: ListenerId, payload: impl Any + Send + Sync) -> Self {
        Self {
            target: Target::Listener(id),
            payload: Box::new(payload),
        }
    }

    /// Borrows the event's payload as `T`, or `None` if it was constructed
    /// with a different payload type. Listeners must not retain this
    /// reference past the call (enforced here by the borrow's lifetime).
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event").field("target", &self.target).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downcast_ref_matches_constructed_payload() {
        let event = Event::with_type("greeting", String::from("hello"));
        assert_eq!(event.downcast_ref::<String>().unwrap(), "hello");
        assert!(event.downcast_ref::<i32>().is_none());
    }

    #[test]
    fn targeted_event_carries_listener_id() {
        let id = ListenerId::from_raw(7);
        let event = Event::targeted(id, 42i32);
        match &event.target {
            Target::Listener(target_id) => assert_eq!(*target_id, id),
            Target::Type(_) => panic!("expected a targeted event"),
        }
    }
}
