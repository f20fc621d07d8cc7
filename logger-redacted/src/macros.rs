// Logging macros that redact the formatted message before it is emitted

#[macro_export]
macro_rules! redacted_debug {
    ($($arg:tt)*) => {
        $crate::__tracing::debug!("{}", $crate::redact(&format!($($arg)*)))
    };
}

#[macro_export]
macro_rules! redacted_warn {
    ($($arg:tt)*) => {
        $crate::__tracing::warn!("{}", $crate::redact(&format!($($arg)*)))
    };
}
