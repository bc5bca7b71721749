//! Core ETL (Extract, Transform, Load) abstractions
//!
//! This module provides the role traits and the [`Pipeline`] that composes them: one
//! extractor reading files into tables, a chain of transformers normalizing them and a
//! loader writing them to their destination.

mod binding;
mod extract;
mod load;
mod pipeline;
mod transform;

pub use binding::{Advisory, Constructor, Params, Role, RoleKind, TransformerRoles, parse_params};
pub use extract::Extractor;
pub use load::{LoadReport, Loader};
pub use pipeline::Pipeline;
pub use transform::{IdentityTransformer, Transformer};
