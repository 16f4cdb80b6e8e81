/*
 * @Description  : 计算图的可序列化描述
 *
 * 支持JSON（便于阅读与调试）与bincode（紧凑的二进制）两种格式。
 * 只有Input、Constant与LstmLayer适配节点可以写入存档；
 * 原语LSTM节点应在分解前以LstmLayer的形式保存。
 */

use serde::{Deserialize, Serialize};

use crate::nn::LstmLayer;
use crate::tensor::Tensor;

pub const DESCRIPTOR_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDescriptor {
    pub version: String,
    pub name: String,
    pub nodes: Vec<NodeDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    pub id: u64,
    pub name: String,
    pub node_type: NodeTypeDescriptor,
    pub output_shape: Vec<usize>,
    /// 按端口顺序排列的父节点id
    pub parents: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeTypeDescriptor {
    Input { shape: Vec<usize> },
    Constant { value: Tensor },
    LstmLayer { layer: LstmLayer },
}

impl GraphDescriptor {
    pub fn new(name: &str) -> Self {
        Self {
            version: DESCRIPTOR_VERSION.to_string(),
            name: name.to_string(),
            nodes: Vec::new(),
        }
    }

    pub fn add_node(&mut self, node: NodeDescriptor) {
        self.nodes.push(node);
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}
