//! Binary classification models behind a common fit/predict seam.
//!
//! Provides a hand-rolled CART decision tree, linear and quadratic
//! discriminant analysis, an SGD-trained linear model and a standard scaler.
//! Every model fits on row-major `&[Vec<f64>]` features with `bool` labels.

mod error;
mod fit;
mod lda;
mod linalg;
mod node;
mod qda;
mod scaler;
mod sgd;
mod split;
mod tree;

pub use error::ModelError;
pub use fit::{Fit, Predict};
pub use lda::{LdaConfig, LinearDiscriminant};
pub use node::{ClassCounts, FeatureIndex, Impurity, Node, NodeIndex};
pub use qda::{QdaConfig, QuadraticDiscriminant};
pub use scaler::StandardScaler;
pub use sgd::{Loss, SgdConfig, SgdModel};
pub use split::SplitCriterion;
pub use tree::{DecisionTree, DecisionTreeConfig};
