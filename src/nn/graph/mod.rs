/*
 * @Description  : Graph 模块：计算图的核心实现
 *
 * 公开 API：
 * - `Graph`: 计算图（节点构建、解释执行、状态重置、存档）
 * - `ModelTransformer`: 图变换（复制 / 分解）
 * - `GraphError`: 错误类型
 */

mod error;
mod inner;
mod transformer;

pub use error::GraphError;
pub use inner::Graph;
pub use transformer::ModelTransformer;
