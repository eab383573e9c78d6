//! A macro to locate unwraps that cannot fail in practice.

/// Panics with the call site if the value cannot be unwrapped.
#[macro_export]
macro_rules! unwrap {
    ($e:expr) => {
        $crate::unwrap::Unwrap::unwrap(
            $e,
            format_args!("at {}:{}:{}", file!(), line!(), column!()),
        )
    };
    ($e:expr, $($msg:tt)*) => {
        $crate::unwrap::Unwrap::unwrap(
            $e,
            format_args!("({}) at {}:{}:{}", format_args!($($msg)*), file!(), line!(), column!()),
        )
    };
}

pub trait Unwrap {
    /// The type returned by unwrapping.
    type Output;

    /// Unwraps the value or panics with the given location.
    fn unwrap(self, location: std::fmt::Arguments) -> Self::Output;
}

impl<T> Unwrap for Option<T> {
    type Output = T;

    fn unwrap(self, location: std::fmt::Arguments) -> Self::Output {
        match self {
            Some(t) => t,
            None => panic!("unwrapped an empty option {}", location),
        }
    }
}

impl<T, E: std::fmt::Debug> Unwrap for Result<T, E> {
    type Output = T;

    fn unwrap(self, location: std::fmt::Arguments) -> Self::Output {
        match self {
            Ok(t) => t,
            Err(err) => panic!("unwrapped error {:?} {}", err, location),
        }
    }
}
