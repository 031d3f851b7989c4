use std::borrow::Cow;

use crate::traits::SQLParam;

/// A bound SQL parameter value.
///
/// The placeholder text (`?`, `$1`, ...) is decided by the value's dialect at
/// render time, so a `Param` only carries the value itself.
#[derive(Debug, Clone)]
pub struct Param<'a, V: SQLParam> {
    /// The value to bind
    pub value: Cow<'a, V>,
}

impl<'a, V: SQLParam> Param<'a, V> {
    pub fn new(value: impl Into<Cow<'a, V>>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Creates a parameter borrowing its value.
    pub const fn borrowed(value: &'a V) -> Self {
        Self {
            value: Cow::Borrowed(value),
        }
    }
}
