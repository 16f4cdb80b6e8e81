/*
 * @Description  : 负责计算图（graph）的构建、分解与解释执行；
 *                 其中LSTM原语节点与LSTM层适配节点是本crate的核心
 */

mod activation;
mod descriptor;
mod graph;
pub mod layer;
mod memory_layout;
mod nodes;

pub use activation::{
    Activation, HardSigmoid, HardTanh, LeakyReLU, ReLU, Sigmoid, Softmax, Tanh, TraitActivation,
};
pub use descriptor::{GraphDescriptor, NodeDescriptor, NodeTypeDescriptor};
pub use graph::{Graph, GraphError, ModelTransformer};
pub use layer::LstmLayer;
pub use memory_layout::{DimensionOrder, MemoryLayout};
pub use nodes::raw_node::{GateKind, LstmPorts};
pub use nodes::NodeId;
pub(crate) use nodes::raw_node::{Gate, TraitNode};
pub(crate) use nodes::{NodeHandle, NodeType};

#[cfg(test)]
mod tests;
