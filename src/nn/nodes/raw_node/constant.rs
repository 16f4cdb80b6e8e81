use std::sync::Arc;

use crate::compiler::{BufferSlot, NodeCompileContext};
use crate::nn::{GraphError, ModelTransformer, NodeId, NodeTypeDescriptor};
use crate::tensor::Tensor;

use super::TraitNode;

/// 常量数据节点，如分解后各门的权重、偏置。
/// 数据经`Arc`共享，图变换时复制出的节点引用同一份数据
#[derive(Debug)]
pub(crate) struct Constant {
    value: Arc<Tensor>,
}

impl Constant {
    pub(crate) fn new(value: Arc<Tensor>) -> Result<Self, GraphError> {
        if value.size() == 0 {
            return Err(GraphError::InvalidOperation(
                "常量节点的值不能为空".to_string(),
            ));
        }
        Ok(Self { value })
    }
}

impl TraitNode for Constant {
    fn type_name(&self) -> &'static str {
        "Constant"
    }

    fn port_names(&self) -> &'static [&'static str] {
        &[]
    }

    fn value_expected_shape(&self) -> &[usize] {
        self.value.shape()
    }

    fn value(&self) -> Option<&Tensor> {
        Some(&self.value)
    }

    fn calc_value_by_parents(&mut self, _parents: &[&Tensor]) -> Result<(), GraphError> {
        Ok(())
    }

    fn compile(&self, ctx: &mut NodeCompileContext<'_>) -> Result<BufferSlot, GraphError> {
        Ok(ctx.emitter().constant(self.value.data_as_slice()))
    }

    fn copy(
        &self,
        name: &str,
        _parents: &[NodeId],
        transformer: &mut ModelTransformer,
    ) -> Result<NodeId, GraphError> {
        transformer
            .target_mut()
            .new_constant_node(Arc::clone(&self.value), Some(name))
    }

    fn write_to_archive(&self) -> Result<NodeTypeDescriptor, GraphError> {
        Ok(NodeTypeDescriptor::Constant {
            value: self.value.as_ref().clone(),
        })
    }
}
