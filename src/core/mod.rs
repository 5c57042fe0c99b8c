mod combination_table;
mod error;
mod factor;
mod factor_graph;
mod node;
mod registry;
mod variable;

pub use combination_table::CombinationTable;
pub use error::{GraphError, GraphResult};
pub use factor::FactorNode;
pub use factor_graph::FactorGraph;
pub use node::{FactorId, GraphId, NodeRef, Port, TableId, VarId};
pub use registry::Registry;
pub use variable::VariableNode;
