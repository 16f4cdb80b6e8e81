/*
 * @Author       : 老董
 * @Date         : 2026-01-27
 * @LastEditors  : 老董
 * @LastEditTime : 2026-10-09
 * @Description  : Graph 节点构建方法（new_*_node）
 */

use std::sync::Arc;

use super::Graph;
use crate::nn::nodes::raw_node::{Constant, Input, Lstm, LstmLayerNode};
use crate::nn::nodes::NodeHandle;
use crate::nn::{Activation, GraphError, LstmLayer, LstmPorts, MemoryLayout, NodeId};
use crate::tensor::Tensor;

impl Graph {
    /// 添加节点到列表
    pub(in crate::nn::graph) fn add_node_to_list(
        &mut self,
        mut node_handle: NodeHandle,
        name: Option<&str>,
        node_type: &str,
        parents: &[NodeId],
    ) -> Result<NodeId, GraphError> {
        let node_name = self.generate_valid_new_node_name(name.unwrap_or(""), node_type)?;
        let node_id = self.generate_valid_node_id();

        for &parent_id in parents {
            self.forward_edges
                .entry(parent_id)
                .or_default()
                .push(node_id);
        }
        self.backward_edges
            .entry(node_id)
            .or_default()
            .extend(parents);

        node_handle.bind_id_and_name(node_id, &node_name);
        self.nodes.insert(node_id, node_handle);
        Ok(node_id)
    }

    /// 创建输入节点
    pub fn new_input_node(
        &mut self,
        shape: &[usize],
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = NodeHandle::new(Input::new(shape)?);
        self.add_node_to_list(node, name, "input", &[])
    }

    /// 创建常量节点；传入`Arc<Tensor>`时与调用方共享数据
    pub fn new_constant_node(
        &mut self,
        value: impl Into<Arc<Tensor>>,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let node = NodeHandle::new(Constant::new(value.into())?);
        self.add_node_to_list(node, name, "constant", &[])
    }

    /// 创建LSTM原语节点，各端口在接线时即校验形状
    pub fn new_lstm_node(
        &mut self,
        ports: LstmPorts,
        activation: Activation,
        recurrent_activation: Activation,
        input_layout: MemoryLayout,
        output_layout: MemoryLayout,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let parents = ports.to_parents();
        let node = {
            let parent_nodes = self.get_nodes(&parents)?;
            Lstm::new(
                &parent_nodes,
                activation,
                recurrent_activation,
                input_layout,
                output_layout,
            )?
        };
        self.add_node_to_list(NodeHandle::new(node), name, "lstm", &parents)
    }

    /// 创建LSTM层适配节点（须经`refine`分解后才能求值或编译）
    pub fn new_lstm_layer_node(
        &mut self,
        input: NodeId,
        reset: NodeId,
        layer: impl Into<Arc<LstmLayer>>,
        name: Option<&str>,
    ) -> Result<NodeId, GraphError> {
        let parents = [input, reset];
        let node = {
            let parent_nodes = self.get_nodes(&parents)?;
            LstmLayerNode::new(&parent_nodes, layer.into())?
        };
        self.add_node_to_list(NodeHandle::new(node), name, "lstm_layer", &parents)
    }
}
