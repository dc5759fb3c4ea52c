use std::collections::BTreeMap;

/// Context key carrying the request trace identifier.
pub const TRACE_ID_KEY: &str = "trace_id";

/// Context key carrying the acting user identifier.
pub const USER_ID_KEY: &str = "user_id";

/// Request-scoped values passed alongside a log call.
///
/// The shipper only ever reads the correlation keys ([`TRACE_ID_KEY`] and
/// [`USER_ID_KEY`]); other keys are carried for callers that want to share
/// one bag across layers. Values of any JSON type may be stored, but only
/// strings are treated as correlation identifiers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: BTreeMap<String, serde_json::Value>,
}

impl Context {
    /// An empty context.
    pub fn background() -> Self {
        Self::default()
    }

    /// Return a copy of this context with `key` set to `value`.
    pub fn with_value(&self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        let mut values = self.values.clone();
        values.insert(key.into(), value.into());
        Context { values }
    }

    pub fn with_trace_id(&self, trace_id: impl Into<String>) -> Self {
        self.with_value(TRACE_ID_KEY, trace_id.into())
    }

    pub fn with_user_id(&self, user_id: impl Into<String>) -> Self {
        self.with_value(USER_ID_KEY, user_id.into())
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }
}

/// Look up a correlation identifier in `context`.
///
/// Returns `None` when the key is absent or holds anything other than a
/// string; a mistyped value is ignored rather than reported.
pub fn lookup_correlation<'a>(context: &'a Context, key: &str) -> Option<&'a str> {
    context.get(key).and_then(|value| value.as_str())
}
