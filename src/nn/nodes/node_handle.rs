use std::fmt;

use serde::{Deserialize, Serialize};

use super::raw_node::{NodeType, TraitNode};
use crate::nn::GraphError;
use crate::tensor::Tensor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 图中节点的外壳：持有节点的id、名称以及具体的原始节点（raw node）。
/// 节点的父子关系由`Graph`统一维护，这里不重复存放。
#[derive(Debug)]
pub(crate) struct NodeHandle {
    id: NodeId,
    name: String,
    raw_node: NodeType,
}

impl NodeHandle {
    pub(crate) fn new<T: Into<NodeType>>(raw_node: T) -> Self {
        Self {
            id: NodeId(0),
            name: String::new(),
            raw_node: raw_node.into(),
        }
    }

    pub(in crate::nn) fn bind_id_and_name(&mut self, id: NodeId, name: &str) {
        self.id = id;
        self.name = name.to_string();
    }

    pub(crate) const fn id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) const fn node_type(&self) -> &NodeType {
        &self.raw_node
    }

    pub(crate) fn node_type_mut(&mut self) -> &mut NodeType {
        &mut self.raw_node
    }

    pub(crate) fn type_name(&self) -> &'static str {
        self.raw_node.type_name()
    }

    pub(crate) fn value(&self) -> Option<&Tensor> {
        self.raw_node.value()
    }

    pub(crate) fn set_value(&mut self, value: &Tensor) -> Result<(), GraphError> {
        self.raw_node.set_value(value)
    }

    pub(crate) fn value_expected_shape(&self) -> &[usize] {
        self.raw_node.value_expected_shape()
    }

    /// 输出端口的元素个数
    pub(crate) fn output_size(&self) -> usize {
        self.value_expected_shape().iter().product()
    }

    pub(crate) fn calc_value_by_parents(&mut self, parents: &[&Tensor]) -> Result<(), GraphError> {
        self.raw_node.calc_value_by_parents(parents)
    }

    pub(crate) fn has_state(&self) -> bool {
        self.raw_node.has_state()
    }

    pub(crate) fn reset(&mut self) {
        self.raw_node.reset();
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "节点[id={}, name={}, type={}]",
            self.id,
            self.name,
            self.type_name()
        )
    }
}
