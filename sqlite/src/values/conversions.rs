//! Conversions between Rust values and [`SQLiteValue`].

use std::borrow::Cow;

use super::SQLiteValue;

//------------------------------------------------------------------------------
// From<T> implementations
//------------------------------------------------------------------------------

macro_rules! impl_from_integer {
    ($($ty:ty),+) => {
        $(
            impl<'a> From<$ty> for SQLiteValue<'a> {
                fn from(value: $ty) -> Self {
                    SQLiteValue::Integer(value as i64)
                }
            }

            impl<'a> From<&'a $ty> for SQLiteValue<'a> {
                fn from(value: &'a $ty) -> Self {
                    SQLiteValue::Integer(*value as i64)
                }
            }
        )+
    };
}

impl_from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl<'a> From<f64> for SQLiteValue<'a> {
    fn from(value: f64) -> Self {
        SQLiteValue::Real(value)
    }
}

// --- Boolean ---

impl<'a> From<bool> for SQLiteValue<'a> {
    fn from(value: bool) -> Self {
        SQLiteValue::Integer(value as i64)
    }
}

// --- String Types ---

impl<'a> From<&'a str> for SQLiteValue<'a> {
    fn from(value: &'a str) -> Self {
        SQLiteValue::Text(Cow::Borrowed(value))
    }
}

impl<'a> From<String> for SQLiteValue<'a> {
    fn from(value: String) -> Self {
        SQLiteValue::Text(Cow::Owned(value))
    }
}

impl<'a> From<&'a String> for SQLiteValue<'a> {
    fn from(value: &'a String) -> Self {
        SQLiteValue::Text(Cow::Borrowed(value))
    }
}

// --- Binary Data ---

impl<'a> From<&'a [u8]> for SQLiteValue<'a> {
    fn from(value: &'a [u8]) -> Self {
        SQLiteValue::Blob(Cow::Borrowed(value))
    }
}

impl<'a> From<Vec<u8>> for SQLiteValue<'a> {
    fn from(value: Vec<u8>) -> Self {
        SQLiteValue::Blob(Cow::Owned(value))
    }
}

// --- Option Types ---

impl<'a, T> From<Option<T>> for SQLiteValue<'a>
where
    T: Into<SQLiteValue<'a>>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => SQLiteValue::Null,
        }
    }
}

// --- Cow integration for SQL struct ---

impl<'a> From<SQLiteValue<'a>> for Cow<'a, SQLiteValue<'a>> {
    fn from(value: SQLiteValue<'a>) -> Self {
        Cow::Owned(value)
    }
}

impl<'a> From<&'a SQLiteValue<'a>> for Cow<'a, SQLiteValue<'a>> {
    fn from(value: &'a SQLiteValue<'a>) -> Self {
        Cow::Borrowed(value)
    }
}
