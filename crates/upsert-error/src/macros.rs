/// upsert_err!(code, msg) constructs a user-facing [UpsertError], to be used for
/// further processing, e.g. typically used in `.map_err(|_| upsert_err!(..))`
#[macro_export]
macro_rules! upsert_err {
    ($code:expr, $($arg:tt)*) => {
        Box::new($crate::UpsertError::new(
            $code,
            format!($($arg)*),
        ))
    };
}

/// err! constructs a user-facing [UpsertError] and immediately wraps it in an
/// `Err` variant of a `Result`, typically used in `return err!(...)`
#[macro_export]
macro_rules! err {
    ($code:expr, $($arg:tt)*) => {
        Err($crate::upsert_err!($code, $($arg)*))
    };
}

#[macro_export]
macro_rules! unexpected_err {
    ($($arg:tt)*) => {
        Err($crate::unexpected_upsert_err!($($arg)*))
    }
}

#[macro_export]
macro_rules! unexpected_upsert_err {
    ($($arg:tt)*) => {
        Box::new($crate::UpsertError::new_with_forced_backtrace(
            $crate::ErrorCode::Unexpected,
            format!($($arg)*),
        ))
    }
}
