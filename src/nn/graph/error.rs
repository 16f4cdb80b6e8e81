/*
 * @Author       : 老董
 * @Date         : 2025-07-24 16:00:00
 * @LastEditors  : 老董
 * @LastEditTime : 2026-10-08
 * @Description  : Graph 模块的错误类型
 */

use thiserror::Error;

use crate::errors::TensorError;
use crate::nn::NodeId;

/// Graph 操作错误类型
///
/// 构造期的一致性错误（形状/维度不符）在接线时立即报出；
/// `UnsupportedOperation` 单独成类，调用方可据此改走其他路径（如改为序列化适配节点）。
#[derive(Error, Debug, PartialEq, Eq)]
pub enum GraphError {
    #[error("找不到节点{0}")]
    NodeNotFound(NodeId),
    #[error("无效操作：{0}")]
    InvalidOperation(String),
    #[error("不支持的操作：{0}")]
    UnsupportedOperation(String),
    #[error("形状不匹配：{message}（预期{expected:?}，实际{got:?}）")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
        message: String,
    },
    #[error("维度不匹配：{message}（预期{expected}，实际{got}）")]
    DimensionMismatch {
        expected: usize,
        got: usize,
        message: String,
    },
    #[error("节点名称重复：{0}")]
    DuplicateNodeName(String),
    #[error("存档读写失败：{0}")]
    Archive(String),
    #[error(transparent)]
    Tensor(#[from] TensorError),
}
