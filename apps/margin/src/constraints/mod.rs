// Structural constraints: the closed constraint grammar, the natural-language
// extractor that produces it, and the evaluator that judges text metrics against it.

pub mod evaluator;
pub mod extractor;
pub mod model;

pub use evaluator::{evaluate, Evaluation, Metrics};
pub use extractor::extract;
pub use model::{Bound, Constraint, ConstraintSet, CountSpec, Dimension};
