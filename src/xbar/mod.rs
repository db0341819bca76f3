//! Crossbar layers: partitioning, linear primitives and bit-serial execution

mod conv;
mod layer;
mod linear;
mod op;
mod partition;
mod weight_layer;

pub use conv::Conv2dOp;
pub use layer::{CrossbarLayer, ForwardMode, QatGradients};
pub use linear::LinearOp;
pub use op::{CrossbarOp, SubOperation};
pub use partition::{split_by_num, PartitionPlan};
pub use weight_layer::WeightLayer;
