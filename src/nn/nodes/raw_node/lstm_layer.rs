use std::sync::Arc;

use log::debug;

use crate::compiler::{BufferSlot, NodeCompileContext};
use crate::nn::{
    GateKind, GraphError, LstmLayer, LstmPorts, ModelTransformer, NodeHandle, NodeId,
    NodeTypeDescriptor,
};
use crate::tensor::Tensor;

use super::TraitNode;

/// 预训练LSTM层的适配节点：只有输入与重置信号两个端口，参数都在`LstmLayer`里。
/// 它本身不能求值或编译，必须先经`refine`分解为原语LSTM节点与8个常量节点
#[derive(Debug)]
pub(crate) struct LstmLayerNode {
    layer: Arc<LstmLayer>,
    shape: Vec<usize>,
}

impl LstmLayerNode {
    pub(crate) const PORT_NAMES: [&'static str; 2] = ["input", "reset"];

    pub(crate) fn new(parents: &[&NodeHandle], layer: Arc<LstmLayer>) -> Result<Self, GraphError> {
        let [input, reset] = parents else {
            return Err(GraphError::InvalidOperation(format!(
                "LSTM层节点需要2个父节点（输入、重置信号），实际为{}",
                parents.len()
            )));
        };
        layer.validate()?;
        let input_memory_size = layer.input_layout().memory_size();
        if input.output_size() != input_memory_size {
            return Err(GraphError::ShapeMismatch {
                expected: vec![input_memory_size],
                got: input.value_expected_shape().to_vec(),
                message: "LSTM层输入的元素个数须与输入内存布局一致".to_string(),
            });
        }
        if reset.output_size() != 1 {
            return Err(GraphError::ShapeMismatch {
                expected: vec![1],
                got: reset.value_expected_shape().to_vec(),
                message: "LSTM层的重置信号须为标量".to_string(),
            });
        }
        Ok(Self {
            shape: vec![layer.output_layout().memory_size()],
            layer,
        })
    }
}

impl TraitNode for LstmLayerNode {
    fn type_name(&self) -> &'static str {
        "LstmLayer"
    }

    fn port_names(&self) -> &'static [&'static str] {
        &Self::PORT_NAMES
    }

    fn value_expected_shape(&self) -> &[usize] {
        &self.shape
    }

    fn value(&self) -> Option<&Tensor> {
        None
    }

    fn calc_value_by_parents(&mut self, _parents: &[&Tensor]) -> Result<(), GraphError> {
        Err(GraphError::InvalidOperation(
            "LSTM层节点不能直接求值，请先对计算图调用refine".to_string(),
        ))
    }

    fn is_compilable(&self) -> bool {
        false
    }

    fn compile(&self, _ctx: &mut NodeCompileContext<'_>) -> Result<BufferSlot, GraphError> {
        Err(GraphError::InvalidOperation(
            "LSTM层节点不能直接编译，请先对计算图调用refine".to_string(),
        ))
    }

    fn copy(
        &self,
        name: &str,
        parents: &[NodeId],
        transformer: &mut ModelTransformer,
    ) -> Result<NodeId, GraphError> {
        let &[input, reset] = parents else {
            return Err(GraphError::InvalidOperation(format!(
                "LSTM层节点需要2个父节点，实际为{}",
                parents.len()
            )));
        };
        transformer
            .target_mut()
            .new_lstm_layer_node(input, reset, Arc::clone(&self.layer), Some(name))
    }

    /// 分解为8个常量节点（命名为`{name}_{端口名}`）与1个同名的原语LSTM节点
    fn refine(
        &self,
        name: &str,
        parents: &[NodeId],
        transformer: &mut ModelTransformer,
    ) -> Result<NodeId, GraphError> {
        let &[input, reset] = parents else {
            return Err(GraphError::InvalidOperation(format!(
                "LSTM层节点需要2个父节点，实际为{}",
                parents.len()
            )));
        };
        let target = transformer.target_mut();
        let mut weights = [NodeId(0); 4];
        let mut biases = [NodeId(0); 4];
        for kind in GateKind::ALL {
            weights[kind.index()] = target.new_constant_node(
                self.layer.gate_weights(kind)?,
                Some(&format!("{}_{}", name, kind.weights_port_name())),
            )?;
            biases[kind.index()] = target.new_constant_node(
                self.layer.gate_bias(kind)?,
                Some(&format!("{}_{}", name, kind.bias_port_name())),
            )?;
        }
        let lstm = target.new_lstm_node(
            LstmPorts {
                input,
                reset,
                weights,
                biases,
            },
            self.layer.activation(),
            self.layer.recurrent_activation(),
            self.layer.input_layout().clone(),
            self.layer.output_layout().clone(),
            Some(name),
        )?;
        debug!(
            "LSTM层{}已分解为原语LSTM节点{}（输入{}，隐藏{}）",
            name,
            lstm,
            self.layer.input_size(),
            self.layer.hidden_size()
        );
        Ok(lstm)
    }

    fn write_to_archive(&self) -> Result<NodeTypeDescriptor, GraphError> {
        Ok(NodeTypeDescriptor::LstmLayer {
            layer: self.layer.as_ref().clone(),
        })
    }
}
