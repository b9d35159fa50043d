pub mod config;
pub mod error;
pub mod model;
pub mod source;
pub mod cache;
pub mod crawler;
pub mod reconcile;
pub mod store;
pub mod kinship;
pub mod filter;
pub mod session;

pub use config::Config;
pub use error::{AncestaError, Result};
pub use model::{Individual, RelationGraph, Relationship, StrataMap, Stratum};
pub use session::{ExpandOutcome, Session};
