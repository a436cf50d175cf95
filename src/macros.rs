// src/macros.rs

//
// Logging macros
//
// logging feature enabled → tracing
// logging feature disabled → only log_error prints to stderr
//

#![allow(unused_macros)]

// --------------------
// ERROR
// --------------------

#[cfg(feature = "logging")]
macro_rules! log_error {
    ($($arg:tt)*) => {
        tracing::error!($($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_error {
    ($($arg:tt)*) => {
        eprintln!($($arg)*)
    };
}

// --------------------
// WARN
// --------------------

#[cfg(feature = "logging")]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        tracing::warn!($($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_warn {
    ($($arg:tt)*) => {};
}

// --------------------
// INFO
// --------------------

#[cfg(feature = "logging")]
macro_rules! log_info {
    ($($arg:tt)*) => {
        tracing::info!($($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_info {
    ($($arg:tt)*) => {};
}

// --------------------
// DEBUG
// --------------------

#[cfg(feature = "logging")]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

pub(crate) use log_debug;
pub(crate) use log_error;
pub(crate) use log_info;
pub(crate) use log_warn;

// --------------------
// MESSAGE
// --------------------

/// Implement [`Message`](crate::Message) for a serde type with a fixed command.
///
/// The type must implement `serde::Serialize` and `Debug`; its structural
/// payload is whatever `serde_json::to_value` produces for it.
///
/// ```
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct Chat {
///     text: String,
/// }
///
/// muxwire::impl_message!(Chat, "message send");
///
/// let chat = Chat { text: "hi".into() };
/// assert_eq!(muxwire::Message::command(&chat), "message send");
/// ```
#[macro_export]
macro_rules! impl_message {
    ($ty:ty, $command:expr) => {
        impl $crate::Message for $ty {
            fn command(&self) -> &str {
                $command
            }

            fn to_payload(
                &self,
            ) -> ::std::result::Result<$crate::__private::Value, $crate::__private::JsonError> {
                $crate::__private::to_value(self)
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }
        }
    };
}
