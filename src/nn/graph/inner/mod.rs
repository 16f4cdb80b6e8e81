/*
 * @Author       : 老董
 * @Date         : 2026-01-27
 * @Description  : Graph 计算图的实现
 *
 * 各 impl 块分散在子模块中：
 * - core.rs: 基础操作 + forward + 状态重置
 * - node_builders.rs: new_*_node
 * - model_io.rs: describe / 存档读写
 */

mod core;
mod model_io;
mod node_builders;

use std::collections::HashMap;
use std::fmt;

use crate::nn::nodes::NodeHandle;
use crate::nn::NodeId;

/// 计算图。
///
/// 节点id单调递增且父节点总是先于子节点创建，因此按id升序即为一个合法的拓扑序；
/// 图中不存在回边，循环只存在于有状态节点（如LSTM）的内部。
pub struct Graph {
    pub(in crate::nn::graph) name: String,
    pub(in crate::nn::graph) nodes: HashMap<NodeId, NodeHandle>,
    /// 正向边：parent_id -> child_ids（父节点指向子节点）
    pub(in crate::nn::graph) forward_edges: HashMap<NodeId, Vec<NodeId>>,
    /// 反向边：child_id -> parent_ids（按端口顺序）
    pub(in crate::nn::graph) backward_edges: HashMap<NodeId, Vec<NodeId>>,
    pub(in crate::nn::graph) next_id: u64,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("name", &self.name)
            .field("nodes", &self.nodes.len())
            .finish()
    }
}
