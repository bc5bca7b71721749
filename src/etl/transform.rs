//! Transformer trait for table normalization

use crate::table::Table;
use eyre::Result;

/// Transformer trait for one normalization concern
///
/// Transformers take the table by value and hand back a new one; callers reassign.
///
/// # Example
/// ```
/// use tabload::etl::Transformer;
/// use tabload::table::Table;
/// use eyre::Result;
///
/// struct Uppercase;
///
/// impl Transformer for Uppercase {
///     fn transform(&self, table: Table) -> Result<Table> {
///         table.rename_columns(|name| name.to_uppercase())
///     }
/// }
/// ```
pub trait Transformer: Send + Sync {
    /// Transform a table
    ///
    /// # Errors
    /// Returns an error if transformation fails (missing column, wrong value type, etc.)
    fn transform(&self, table: Table) -> Result<Table>;
}

/// Identity transformer that passes tables through unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityTransformer;

impl Transformer for IdentityTransformer {
    fn transform(&self, table: Table) -> Result<Table> {
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    #[test]
    fn test_identity_transformer() {
        let table = Table::from_rows(vec!["a"], vec![vec![Value::Int(1)]]).unwrap();
        let output = IdentityTransformer.transform(table.clone()).unwrap();
        assert_eq!(table, output);
    }
}
