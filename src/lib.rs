//! Weighted hypergraphs for derivation forests.
//!
//! A `Hypergraph` holds finite-state lattices and context-free derivation
//! forests alike. Weights come from a semiring (`weight`); on top of the
//! storage this crate implements reachability-based and cost-based pruning,
//! inside and outside costs, composition and determinization of finite-state
//! hypergraphs, and best-path and k-best extraction.

pub mod best_path;
pub mod composition;
pub mod determinization;
pub mod error;
pub mod hypergraph;
pub mod inside_outside;
pub mod pruning;
pub mod reachability;
pub mod util;
pub mod weight;

pub use crate::error::{HgError, Result};
pub use crate::hypergraph::{
    ArcId, Hyperarc, Hypergraph, Label, Properties, StateId, StateIdTranslation, Sym, SymKind,
    Vocabulary,
};
pub use crate::weight::{DivisibleSemiring, FeatureWeight, Log, PathSemiring, Semiring, Viterbi};
