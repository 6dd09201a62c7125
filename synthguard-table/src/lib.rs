//! Column-oriented tables for the synthguard pipeline.
//!
//! A [`Table`] is an ordered set of named columns, each either numeric or
//! categorical, all sharing one row count. Cells may be missing. The column
//! set and kinds are fixed once a table is built; transformations return new
//! tables instead of mutating in place. The crate also owns quasi-identifier
//! handling and equivalence-class grouping, which both the anonymity enforcer
//! and the certificate assembler depend on.

pub mod column;
pub mod equivalence;
pub mod errors;
pub mod table;

pub use column::{Banding, Column, ColumnData, ColumnKind, MAX_FIXED_BANDS};
pub use equivalence::{EquivalenceClasses, KeyPart, OrderedF64, QiKey, QuasiIdentifierSet};
pub use errors::{TableError, TableResult};
pub use table::{Cell, Table, TableBuilder};
