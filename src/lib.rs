pub mod record;
pub mod context;
pub mod wire;
pub mod sink;
pub mod buffer;
pub mod delivery;
pub mod worker;
pub mod lifecycle;
pub mod logger;
pub mod layer;

#[cfg(feature = "victorialogs")]
pub mod victorialogs;

pub mod config;
pub mod env;
pub mod error;
pub mod init;
pub mod noop_sink;
pub mod stats;

pub use buffer::Offer;
pub use config::{FlushMode, ShipperConfig};
pub use context::{lookup_correlation, Context};
pub use error::LoggerError;
pub use lifecycle::Lifecycle;
pub use logger::Logger;
pub use record::{Fields, LogEntry, LogLevel};

#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}

/// Build a [`Fields`] map from `key => value` pairs.
///
/// Values may be anything serializable; a value that fails to serialize is
/// stored as `null`.
///
/// ```
/// let fields = log_shipper::fields! { "username" => "johndoe", "attempt" => 2 };
/// assert_eq!(fields.len(), 2);
/// ```
#[macro_export]
macro_rules! fields {
    () => {
        $crate::record::Fields::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut fields = $crate::record::Fields::new();
        $(
            fields.insert(
                ::std::string::ToString::to_string(&$key),
                $crate::__private::serde_json::to_value(&$value)
                    .unwrap_or($crate::__private::serde_json::Value::Null),
            );
        )+
        fields
    }};
}
