/*
 * @Author       : 老董
 * @Date         : 2026-01-27
 * @LastEditors  : 老董
 * @LastEditTime : 2026-10-12
 * @Description  : Graph 核心操作 + 前向传播 + 状态重置
 */

use std::collections::{HashMap, HashSet};

use log::debug;

use super::Graph;
use crate::nn::nodes::{NodeHandle, NodeType};
use crate::nn::{DimensionOrder, GraphError, NodeId, TraitNode};
use crate::tensor::Tensor;

impl Graph {
    // ========== 创建 ==========

    pub fn new() -> Self {
        Self::with_name("default_graph")
    }

    pub fn with_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            nodes: HashMap::new(),
            forward_edges: HashMap::new(),
            backward_edges: HashMap::new(),
            next_id: 0,
        }
    }

    // ========== 基础访问器 ==========

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 全部节点id（升序，即拓扑序）
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut ids: Vec<_> = self.nodes.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn nodes_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn get_node(&self, id: NodeId) -> Result<&NodeHandle, GraphError> {
        self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))
    }

    pub(in crate::nn) fn get_node_mut(
        &mut self,
        id: NodeId,
    ) -> Result<&mut NodeHandle, GraphError> {
        self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))
    }

    pub(in crate::nn) fn get_nodes(
        &self,
        ids: &[NodeId],
    ) -> Result<Vec<&NodeHandle>, GraphError> {
        ids.iter().map(|&id| self.get_node(id)).collect()
    }

    /// 父节点，按端口顺序
    pub fn get_node_parents(&self, id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        // 先检查节点是否存在
        let _ = self.get_node(id)?;
        Ok(self.backward_edges.get(&id).cloned().unwrap_or_default())
    }

    pub fn get_node_children(&self, id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        let _ = self.get_node(id)?;
        Ok(self.forward_edges.get(&id).cloned().unwrap_or_default())
    }

    pub fn get_node_name(&self, id: NodeId) -> Result<&str, GraphError> {
        Ok(self.get_node(id)?.name())
    }

    pub fn get_node_id(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .values()
            .find(|node| node.name() == name)
            .map(NodeHandle::id)
    }

    pub fn get_node_type_name(&self, id: NodeId) -> Result<&'static str, GraphError> {
        Ok(self.get_node(id)?.type_name())
    }

    pub fn get_node_port_names(&self, id: NodeId) -> Result<&'static [&'static str], GraphError> {
        Ok(self.get_node(id)?.node_type().port_names())
    }

    pub fn get_node_output_shape(&self, id: NodeId) -> Result<&[usize], GraphError> {
        Ok(self.get_node(id)?.value_expected_shape())
    }

    pub fn get_node_value(&self, id: NodeId) -> Result<Option<&Tensor>, GraphError> {
        Ok(self.get_node(id)?.value())
    }

    pub fn set_node_value(&mut self, id: NodeId, value: &Tensor) -> Result<(), GraphError> {
        self.get_node_mut(id)?.set_value(value)
    }

    /// LSTM节点当前的(h, c)
    pub fn get_lstm_state(&self, id: NodeId) -> Result<(&[f32], &[f32]), GraphError> {
        let node = self.get_node(id)?;
        match node.node_type() {
            NodeType::Lstm(lstm) => Ok((lstm.hidden_state(), lstm.cell_state())),
            _ => Err(GraphError::InvalidOperation(format!(
                "{}不是LSTM原语节点",
                node
            ))),
        }
    }

    // ========== 节点属性 ==========

    pub fn node_has_state(&self, id: NodeId) -> Result<bool, GraphError> {
        Ok(self.get_node(id)?.has_state())
    }

    /// 所有有状态的节点（升序）
    pub fn stateful_nodes(&self) -> Vec<NodeId> {
        let mut ids: Vec<_> = self
            .nodes
            .values()
            .filter(|node| node.has_state())
            .map(NodeHandle::id)
            .collect();
        ids.sort();
        ids
    }

    pub fn can_node_accept_input_layout(
        &self,
        id: NodeId,
        order: &DimensionOrder,
    ) -> Result<bool, GraphError> {
        Ok(self.get_node(id)?.node_type().can_accept_input_layout(order))
    }

    pub fn is_node_compilable(&self, id: NodeId) -> Result<bool, GraphError> {
        Ok(self.get_node(id)?.node_type().is_compilable())
    }

    /// 图中的节点是否都可直接求值/编译（即不含未分解的适配节点）
    pub fn is_refined(&self) -> bool {
        self.nodes
            .values()
            .all(|node| node.node_type().is_compilable())
    }

    // ========== 节点 ID/名称生成 ==========

    pub(in crate::nn::graph) fn generate_valid_node_id(&mut self) -> NodeId {
        // 先递增再返回，所以第一个节点 ID 是 1
        self.next_id += 1;
        NodeId(self.next_id)
    }

    pub(in crate::nn::graph) fn check_duplicate_node_name(
        &self,
        name: &str,
    ) -> Result<(), GraphError> {
        if self.nodes.values().any(|node| node.name() == name) {
            return Err(GraphError::DuplicateNodeName(format!(
                "节点{}在图{}中重复",
                name,
                self.name()
            )));
        }
        Ok(())
    }

    pub(in crate::nn::graph) fn generate_valid_new_node_name(
        &self,
        base_name: &str,
        node_type: &str,
    ) -> Result<String, GraphError> {
        if !base_name.is_empty() {
            self.check_duplicate_node_name(base_name)?;
            return Ok(base_name.to_string());
        }

        let mut counter = 1;
        loop {
            let name = format!("{node_type}_{counter}");
            if self.check_duplicate_node_name(&name).is_ok() {
                return Ok(name);
            }
            counter += 1;
        }
    }

    // ========== 前向传播 ==========

    /// `outputs`及其全部祖先节点的拓扑序
    pub fn topological_order(&self, outputs: &[NodeId]) -> Result<Vec<NodeId>, GraphError> {
        let mut visited = HashSet::new();
        let mut stack = outputs.to_vec();
        while let Some(id) = stack.pop() {
            if visited.insert(id) {
                stack.extend(self.get_node_parents(id)?);
            }
        }
        let mut order: Vec<_> = visited.into_iter().collect();
        order.sort();
        Ok(order)
    }

    /// 计算`node_id`的值。每个祖先节点恰好求值一次，
    /// 有状态节点因此每次调用只前进一步
    pub fn forward(&mut self, node_id: NodeId) -> Result<(), GraphError> {
        for id in self.topological_order(&[node_id])? {
            let parents = self.get_node_parents(id)?;
            // 暂时取出节点，以便同时借用其父节点的值
            let mut node = self.nodes.remove(&id).ok_or(GraphError::NodeNotFound(id))?;
            let result = self.calc_node_value(&mut node, &parents);
            self.nodes.insert(id, node);
            result?;
        }
        Ok(())
    }

    fn calc_node_value(&self, node: &mut NodeHandle, parents: &[NodeId]) -> Result<(), GraphError> {
        let values = parents
            .iter()
            .map(|&parent_id| {
                let parent = self.get_node(parent_id)?;
                parent.value().ok_or_else(|| {
                    GraphError::InvalidOperation(format!("{}的父{}没有值", node, parent))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        node.calc_value_by_parents(&values)
    }

    // ========== 状态 ==========

    /// 清除单个节点的内部状态
    pub fn reset_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        let node = self.get_node_mut(id)?;
        node.reset();
        debug!("已重置{}", node);
        Ok(())
    }

    /// 清除图中全部有状态节点的内部状态
    pub fn reset_all_states(&mut self) {
        for node in self.nodes.values_mut().filter(|node| node.has_state()) {
            node.reset();
        }
    }
}
