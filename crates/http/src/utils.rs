//! Internal helper macros.

/// Returns `Err($error)` early unless `$predicate` holds.
///
/// ```ignore
/// ensure!(len <= max, ParseError::too_large_body(len, max));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
