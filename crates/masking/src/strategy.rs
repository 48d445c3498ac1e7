use core::fmt;

/// Controls how a [`crate::Secret`] renders itself in `Debug` output.
pub trait Strategy<T> {
    /// Write the masked representation of `value`.
    fn fmt(value: &T, fmt: &mut fmt::Formatter<'_>) -> fmt::Result;
}

/// Masks the value but keeps its type name visible.
#[derive(Debug)]
pub struct WithType;

impl<T> Strategy<T> for WithType {
    fn fmt(_: &T, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str("*** ")?;
        fmt.write_str(std::any::type_name::<T>())?;
        fmt.write_str(" ***")
    }
}
