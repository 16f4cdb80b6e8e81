/*
 * @Author       : 老董
 * @Date         : 2026-01-27
 * @LastEditors  : 老董
 * @LastEditTime : 2026-10-14
 * @Description  : Graph 描述与存档读写（describe / from_descriptor / save_model / load_model）
 *
 * 存档只记录Input、Constant与LstmLayer适配节点；已分解出原语LSTM节点的图无法写入存档，
 * 应保存分解前的图，读回后再调用`refine`。
 */

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use log::info;

use super::Graph;
use crate::nn::{
    GraphDescriptor, GraphError, NodeDescriptor, NodeId, NodeTypeDescriptor, TraitNode,
};

impl Graph {
    /// 生成整张图的描述；遇到不可存档的节点时返回`UnsupportedOperation`
    pub fn describe(&self) -> Result<GraphDescriptor, GraphError> {
        let mut descriptor = GraphDescriptor::new(self.name());
        for id in self.nodes() {
            let node = self.get_node(id)?;
            descriptor.add_node(NodeDescriptor {
                id: id.0,
                name: node.name().to_string(),
                node_type: node.node_type().write_to_archive()?,
                output_shape: node.value_expected_shape().to_vec(),
                parents: self.get_node_parents(id)?.iter().map(|p| p.0).collect(),
            });
        }
        Ok(descriptor)
    }

    /// 按描述重建计算图。节点id会重新分配，节点名称保持不变
    pub fn from_descriptor(descriptor: &GraphDescriptor) -> Result<Self, GraphError> {
        let mut graph = Self::with_name(&descriptor.name);
        let mut id_map = HashMap::new();
        for node in &descriptor.nodes {
            let parents = node
                .parents
                .iter()
                .map(|p| {
                    id_map
                        .get(p)
                        .copied()
                        .ok_or(GraphError::NodeNotFound(NodeId(*p)))
                })
                .collect::<Result<Vec<NodeId>, _>>()?;
            let name = Some(node.name.as_str());
            let new_id = match &node.node_type {
                NodeTypeDescriptor::Input { shape } => graph.new_input_node(shape, name)?,
                NodeTypeDescriptor::Constant { value } => {
                    graph.new_constant_node(value.clone(), name)?
                }
                NodeTypeDescriptor::LstmLayer { layer } => {
                    layer.validate()?;
                    let &[input, reset] = parents.as_slice() else {
                        return Err(GraphError::Archive(format!(
                            "LSTM层节点{}需要2个父节点，存档中为{}个",
                            node.name,
                            parents.len()
                        )));
                    };
                    graph.new_lstm_layer_node(input, reset, Arc::new(layer.clone()), name)?
                }
            };
            if graph.get_node_output_shape(new_id)? != node.output_shape.as_slice() {
                return Err(GraphError::Archive(format!(
                    "节点{}的输出形状与存档不符",
                    node.name
                )));
            }
            id_map.insert(node.id, new_id);
        }
        Ok(graph)
    }

    pub fn to_json(&self) -> Result<String, GraphError> {
        self.describe()?
            .to_json()
            .map_err(|e| GraphError::Archive(format!("序列化图描述失败: {e}")))
    }

    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let descriptor = GraphDescriptor::from_json(json)
            .map_err(|e| GraphError::Archive(format!("解析图描述失败: {e}")))?;
        Self::from_descriptor(&descriptor)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, GraphError> {
        self.describe()?
            .to_bytes()
            .map_err(|e| GraphError::Archive(format!("序列化图描述失败: {e}")))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GraphError> {
        let descriptor = GraphDescriptor::from_bytes(bytes)
            .map_err(|e| GraphError::Archive(format!("解析图描述失败: {e}")))?;
        Self::from_descriptor(&descriptor)
    }

    /// 保存模型：扩展名为`.bin`时用bincode，否则用JSON
    ///
    /// # 示例
    /// ```ignore
    /// graph.save_model("models/keyword_spotter.json")?;
    /// ```
    pub fn save_model<P: AsRef<Path>>(&self, path: P) -> Result<(), GraphError> {
        let path = path.as_ref();
        let bytes = if is_binary(path) {
            self.to_bytes()?
        } else {
            self.to_json()?.into_bytes()
        };
        std::fs::write(path, bytes)
            .map_err(|e| GraphError::Archive(format!("写入文件{}失败: {e}", path.display())))?;
        info!("已将图{}保存到{}", self.name(), path.display());
        Ok(())
    }

    /// 读取`save_model`保存的模型
    pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Self, GraphError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| GraphError::Archive(format!("读取文件{}失败: {e}", path.display())))?;
        let graph = if is_binary(path) {
            Self::from_bytes(&bytes)?
        } else {
            let json = String::from_utf8(bytes)
                .map_err(|e| GraphError::Archive(format!("文件不是合法的UTF-8: {e}")))?;
            Self::from_json(&json)?
        };
        info!("已从{}读取图{}", path.display(), graph.name());
        Ok(graph)
    }
}

fn is_binary(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "bin")
}
