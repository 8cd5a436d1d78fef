//! Event label formatting and filtering of transport-internal event names.

/// Event names with these prefixes belong to the transport itself.
pub const RESERVED_PREFIXES: [&str; 2] = ["pusher:", "pusher_internal:"];

/// Marker that tells the formatter an event name is already fully qualified.
pub const EVENT_MARKER: char = '.';

/// Returns true for transport-internal events such as `pusher:subscription_succeeded`.
pub fn is_reserved(event: &str) -> bool {
    RESERVED_PREFIXES.iter().any(|prefix| event.starts_with(prefix))
}

/// Removes one leading [`EVENT_MARKER`], if present.
pub fn strip_marker(event: &str) -> &str {
    event.strip_prefix(EVENT_MARKER).unwrap_or(event)
}

/// Turns a listen label into the event name carried on the wire.
///
/// Labels starting with `.` or `\` are taken literally (minus that first
/// character). Anything else is qualified with the namespace, whose dots
/// become backslashes: `CardMoved` under `App.Events` is `App\Events\CardMoved`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFormatter {
    namespace: Option<String>,
}

impl EventFormatter {
    pub fn new(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            namespace: if namespace.is_empty() {
                None
            } else {
                Some(namespace)
            },
        }
    }

    /// A formatter that never qualifies labels.
    pub fn without_namespace() -> Self {
        Self { namespace: None }
    }

    pub fn format(&self, label: &str) -> String {
        if let Some(rest) = label.strip_prefix(EVENT_MARKER) {
            return rest.to_string();
        }
        if let Some(rest) = label.strip_prefix('\\') {
            return rest.to_string();
        }
        match &self.namespace {
            Some(namespace) => format!("{}.{}", namespace, label).replace('.', "\\"),
            None => label.to_string(),
        }
    }
}

impl Default for EventFormatter {
    fn default() -> Self {
        Self::new("App.Events")
    }
}
