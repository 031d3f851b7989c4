use crate::dialect::Dialect;

/// A marker trait for types that can be used as SQL parameters.
///
/// This trait is used as a bound on the parameter type in SQL fragments.
/// It ties a value type to the dialect whose placeholders it is rendered with.
pub trait SQLParam: Clone + core::fmt::Debug {
    /// The SQL dialect for this parameter type
    const DIALECT: Dialect;
}
