/*
 * @Author       : 老董
 * @Date         : 2026-10-10
 * @Description  : 图变换：把源图逐节点复制（或分解）到一张新图中
 */

use std::collections::HashMap;

use log::debug;

use super::{Graph, GraphError};
use crate::nn::{NodeId, TraitNode};

/// 变换过程中的目标图以及“源节点 -> 目标节点”的映射。
/// 源节点按拓扑序依次处理，处理某节点时其父节点都已映射完毕
#[derive(Debug)]
pub struct ModelTransformer {
    target: Graph,
    node_map: HashMap<NodeId, NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transform {
    Copy,
    Refine,
}

impl ModelTransformer {
    pub fn new(target: Graph) -> Self {
        Self {
            target,
            node_map: HashMap::new(),
        }
    }

    /// 原样复制整张图（有状态节点的状态不随之复制）
    pub fn copy_graph(source: &Graph) -> Result<Graph, GraphError> {
        Self::transform(source, Transform::Copy)
    }

    /// 复制整张图，并把其中的适配节点分解为原语节点
    pub fn refine_graph(source: &Graph) -> Result<Graph, GraphError> {
        Self::transform(source, Transform::Refine)
    }

    fn transform(source: &Graph, mode: Transform) -> Result<Graph, GraphError> {
        let mut transformer = Self::new(Graph::with_name(source.name()));
        for id in source.nodes() {
            transformer.transform_node(source, id, mode)?;
        }
        debug!(
            "图{}经{:?}变换后共有{}个节点（原{}个）",
            source.name(),
            mode,
            transformer.target.nodes_count(),
            source.nodes_count()
        );
        Ok(transformer.into_target())
    }

    fn transform_node(
        &mut self,
        source: &Graph,
        id: NodeId,
        mode: Transform,
    ) -> Result<NodeId, GraphError> {
        let node = source.get_node(id)?;
        let parents = self.map_nodes(&source.get_node_parents(id)?)?;
        let new_id = match mode {
            Transform::Copy => node.node_type().copy(node.name(), &parents, self)?,
            Transform::Refine => node.node_type().refine(node.name(), &parents, self)?,
        };
        self.node_map.insert(id, new_id);
        Ok(new_id)
    }

    pub fn target(&self) -> &Graph {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut Graph {
        &mut self.target
    }

    pub fn into_target(self) -> Graph {
        self.target
    }

    /// 源节点在目标图中的对应节点
    pub fn map_node(&self, source: NodeId) -> Result<NodeId, GraphError> {
        self.node_map
            .get(&source)
            .copied()
            .ok_or(GraphError::NodeNotFound(source))
    }

    pub fn map_nodes(&self, sources: &[NodeId]) -> Result<Vec<NodeId>, GraphError> {
        sources.iter().map(|&id| self.map_node(id)).collect()
    }
}

impl Graph {
    /// 复制整张图（有状态节点的状态不随之复制）
    pub fn copy(&self) -> Result<Self, GraphError> {
        ModelTransformer::copy_graph(self)
    }

    /// 把图中的适配节点分解为原语节点，得到可求值、可编译的新图
    pub fn refine(&self) -> Result<Self, GraphError> {
        ModelTransformer::refine_graph(self)
    }
}
