//! A continuation-passing-style graph IR and its partial evaluator.
//!
//! All nodes live in a [`World`]. Values are hash-consed; continuations
//! are nominal and mutable. [`partial_evaluation`] specializes calls on
//! their constant arguments until nothing is left to specialize.

pub mod def;
pub mod domtree;
pub mod drop;
pub mod eval;
mod fold;
pub mod interp;
pub mod lambda;
pub mod merge;
pub mod print;
pub mod samples;
pub mod scope;
pub mod stats;
pub mod value;
pub mod verify;
pub mod world;

pub use def::{ArithOpKind, ConvOpKind, Def, NodeKind, PrimTypeKind, RelOpKind, Use};
pub use domtree::DomTree;
pub use drop::{drop, drop_one, drop_prefix, Dropper};
pub use eval::{partial_evaluation, Outcome, PeOptions, PeResult};
pub use merge::merge_lambdas;
pub use scope::Scope;
pub use stats::PeStats;
pub use value::Value;
pub use verify::verify;
pub use world::World;
