//!
//! Access to the inner value of a secret.
//!

use crate::{Secret, Strategy};

/// Borrow the inner secret.
pub trait PeekInterface<S> {
    /// Only way to read a secret without consuming it.
    fn peek(&self) -> &S;
}

/// Consume a secret and hand out the inner value.
pub trait ExposeInterface<S> {
    /// Consume the secret and return the inner value
    fn expose(self) -> S;
}

impl<S, I> ExposeInterface<S> for Secret<S, I>
where
    I: Strategy<S>,
{
    fn expose(self) -> S {
        self.inner_secret
    }
}
