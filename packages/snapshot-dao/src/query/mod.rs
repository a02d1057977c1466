//! Query layer - templates, criteria, execution
//!
//! ```text
//! SearchBuilder ──freeze()──▶ Template ──create()──▶ SearchCriteria
//!                                                        │ set_parameter()
//!                                                        ▼
//!                         Filter (optional) ──▶ QueryEngine::{list_by, search, ...}
//!                                                        │ render() + ExecutionMode
//!                                                        ▼
//!                                                   SqliteStore
//! ```
//!
//! Templates are built once (usually in a repository constructor) and shared;
//! criteria are created per call.

pub mod criteria;
pub mod engine;
pub mod filter;
pub mod schema;
pub(crate) mod sql;
pub mod template;
pub mod value;

pub use criteria::SearchCriteria;
pub use engine::{ExecutionMode, QueryEngine};
pub use filter::{Filter, Order};
pub use schema::{Column, Entity};
pub use template::{Aggregate, Op, SearchBuilder, Template};
pub use value::{FieldType, Scalar, Value};
