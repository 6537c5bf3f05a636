//! Query description, clause tree and compiler

pub mod clause;
pub mod compiler;
pub mod types;

pub use clause::{fields, Clause, Combinator, CompiledQuery, DomainQuery, Group};
pub use compiler::compile;
pub use types::{Domain, QueryDescription};
