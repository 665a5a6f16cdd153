//! Supporting utility types shared across the crate.

mod bytestr;
mod general;

pub use bytestr::ByteStr;
pub use general::GeneralError;
pub(crate) use general::general;

/// Verbose wire-level tracing, only compiled in behind `log-verbose`.
macro_rules! trace {
    ($($tt:tt)*) => {
        #[cfg(feature = "log-verbose")] log::trace!($($tt)*)
    };
}

pub(crate) use trace;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
