use std::collections::HashMap;

use super::tokenizer::WireEvent;

/// Visitor over dispatched wire events
///
/// Per-field hooks default to `on_chunk`, which defaults to a no-op; a
/// visitor overrides only the fields it cares about and everything else
/// falls through.
pub trait EventVisitor: Send {
    /// Fallback for fields without a dedicated hook
    fn on_chunk(&mut self, _event: &WireEvent) {}

    fn on_data(&mut self, event: &WireEvent) {
        self.on_chunk(event);
    }

    fn on_event(&mut self, event: &WireEvent) {
        self.on_chunk(event);
    }

    fn on_id(&mut self, event: &WireEvent) {
        self.on_chunk(event);
    }

    fn on_retry(&mut self, event: &WireEvent) {
        self.on_chunk(event);
    }
}

type Handler = Box<dyn FnMut(&WireEvent) + Send>;

/// Routes wire events to field-name subscribers and registered visitors
///
/// Subscribers for a field run before visitors, each group in registration
/// order. Registration enforces no uniqueness; a visitor registered twice is
/// invoked twice.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<String, Vec<Handler>>,
    visitors: Vec<Box<dyn EventVisitor>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a callback to one field name
    pub fn on<F>(&mut self, field: impl Into<String>, handler: F)
    where
        F: FnMut(&WireEvent) + Send + 'static,
    {
        self.handlers
            .entry(field.into())
            .or_default()
            .push(Box::new(handler));
    }

    /// Register a visitor for all events
    pub fn register(&mut self, visitor: Box<dyn EventVisitor>) {
        self.visitors.push(visitor);
    }

    /// Route one event
    pub fn dispatch(&mut self, event: &WireEvent) {
        if let Some(handlers) = self.handlers.get_mut(&event.field) {
            for handler in handlers.iter_mut() {
                handler(event);
            }
        }

        for visitor in self.visitors.iter_mut() {
            match event.field.as_str() {
                "data" => visitor.on_data(event),
                "event" => visitor.on_event(event),
                "id" => visitor.on_id(event),
                "retry" => visitor.on_retry(event),
                _ => visitor.on_chunk(event),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn event(field: &str, value: &str) -> WireEvent {
        WireEvent {
            field: field.to_string(),
            value: value.to_string(),
            raw: format!("{field}: {value}"),
        }
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = EventDispatcher::new();

        let first = Arc::clone(&seen);
        dispatcher.on("data", move |_| first.lock().unwrap().push("first"));
        let second = Arc::clone(&seen);
        dispatcher.on("data", move |_| second.lock().unwrap().push("second"));

        dispatcher.dispatch(&event("data", "x"));
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_handler_only_sees_its_field() {
        let count = Arc::new(Mutex::new(0));
        let mut dispatcher = EventDispatcher::new();

        let counter = Arc::clone(&count);
        dispatcher.on("data", move |_| *counter.lock().unwrap() += 1);

        dispatcher.dispatch(&event("event", "ping"));
        dispatcher.dispatch(&event("data", "x"));
        assert_eq!(*count.lock().unwrap(), 1);
    }

    struct Recorder {
        data: Arc<Mutex<Vec<String>>>,
        other: Arc<Mutex<Vec<String>>>,
    }

    impl EventVisitor for Recorder {
        fn on_chunk(&mut self, event: &WireEvent) {
            self.other.lock().unwrap().push(event.field.clone());
        }

        fn on_data(&mut self, event: &WireEvent) {
            self.data.lock().unwrap().push(event.value.clone());
        }
    }

    #[test]
    fn test_visitor_field_hook_and_fallback() {
        let data = Arc::new(Mutex::new(Vec::new()));
        let other = Arc::new(Mutex::new(Vec::new()));

        let mut dispatcher = EventDispatcher::new();
        dispatcher.register(Box::new(Recorder {
            data: Arc::clone(&data),
            other: Arc::clone(&other),
        }));

        dispatcher.dispatch(&event("data", "payload"));
        dispatcher.dispatch(&event("id", "7"));
        dispatcher.dispatch(&event("x-vendor", "y"));

        assert_eq!(*data.lock().unwrap(), vec!["payload"]);
        // "id" has no override here, so it falls through to on_chunk too
        assert_eq!(*other.lock().unwrap(), vec!["id", "x-vendor"]);
    }

    #[test]
    fn test_duplicate_visitors_both_invoked() {
        let data = Arc::new(Mutex::new(Vec::new()));
        let other = Arc::new(Mutex::new(Vec::new()));

        let mut dispatcher = EventDispatcher::new();
        for _ in 0..2 {
            dispatcher.register(Box::new(Recorder {
                data: Arc::clone(&data),
                other: Arc::clone(&other),
            }));
        }

        dispatcher.dispatch(&event("data", "payload"));
        assert_eq!(data.lock().unwrap().len(), 2);
    }
}
