use crate::compiler::{BufferSlot, NodeCompileContext};
use crate::nn::{GraphError, ModelTransformer, NodeId, NodeTypeDescriptor};
use crate::tensor::Tensor;

use super::TraitNode;

/// 输入节点：值由用户通过`Graph::set_node_value`提供
#[derive(Debug)]
pub(crate) struct Input {
    value: Option<Tensor>,
    shape: Vec<usize>,
}

impl Input {
    pub(crate) fn new(shape: &[usize]) -> Result<Self, GraphError> {
        if shape.is_empty() || shape.iter().product::<usize>() == 0 {
            return Err(GraphError::InvalidOperation(format!(
                "输入节点的形状{:?}中不能没有元素",
                shape
            )));
        }
        Ok(Self {
            value: None,
            shape: shape.to_vec(),
        })
    }
}

impl TraitNode for Input {
    fn type_name(&self) -> &'static str {
        "Input"
    }

    fn port_names(&self) -> &'static [&'static str] {
        &[]
    }

    fn value_expected_shape(&self) -> &[usize] {
        &self.shape
    }

    fn value(&self) -> Option<&Tensor> {
        self.value.as_ref()
    }

    fn set_value(&mut self, value: &Tensor) -> Result<(), GraphError> {
        if value.shape() != self.shape.as_slice() {
            return Err(GraphError::ShapeMismatch {
                expected: self.shape.clone(),
                got: value.shape().to_vec(),
                message: "输入节点的新值与其形状不符".to_string(),
            });
        }
        self.value = Some(value.clone());
        Ok(())
    }

    fn calc_value_by_parents(&mut self, _parents: &[&Tensor]) -> Result<(), GraphError> {
        if self.value.is_none() {
            return Err(GraphError::InvalidOperation(
                "输入节点尚未赋值，请先调用set_node_value".to_string(),
            ));
        }
        Ok(())
    }

    fn compile(&self, ctx: &mut NodeCompileContext<'_>) -> Result<BufferSlot, GraphError> {
        let initial = self.value.as_ref().map(Tensor::data_as_slice);
        Ok(ctx
            .emitter()
            .input(self.shape.iter().product(), initial))
    }

    fn copy(
        &self,
        name: &str,
        _parents: &[NodeId],
        transformer: &mut ModelTransformer,
    ) -> Result<NodeId, GraphError> {
        let target = transformer.target_mut();
        let id = target.new_input_node(&self.shape, Some(name))?;
        if let Some(value) = &self.value {
            target.set_node_value(id, value)?;
        }
        Ok(id)
    }

    fn write_to_archive(&self) -> Result<NodeTypeDescriptor, GraphError> {
        Ok(NodeTypeDescriptor::Input {
            shape: self.shape.clone(),
        })
    }
}
