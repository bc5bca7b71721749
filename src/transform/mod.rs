//! Transform implementations for tables
//!
//! [`Normalizer`] is the default transformer of a pipeline and covers the usual clean-up in
//! one pass. The other transformers each handle a single concern and are meant to be
//! chained.

mod columns;
mod contents;
mod dates;
mod departement;
mod join;
mod merger;
mod normalizer;
mod replace;

pub use columns::{ColumnCapitaliser, ColumnReplacer, ColumnStripper};
pub use contents::{ContentReplacer, ContentStripper, NullValuesReplacer};
pub use dates::{DateFormatter, DateParser};
pub use departement::DepartementCodeParser;
pub use join::{JoinKind, join};
pub use merger::Merger;
pub use normalizer::{Normalizer, NormalizerOptions, Referential};
pub use replace::ReplaceMap;
