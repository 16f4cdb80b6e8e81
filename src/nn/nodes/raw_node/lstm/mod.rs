/*
 * @Author       : 老董
 * @Date         : 2026-10-06
 * @Description  : LSTM原语节点
 *
 * 节点有10个输入端口：输入、重置信号，以及4个门各自的权重与偏置（均为图中的常量节点）。
 * 循环所需的h、c保存在节点内部，因此计算图本身仍是无环的；
 * 重置信号由非零变为零时（下降沿）清空h、c。
 */

mod emit;
mod state;
mod step;

pub use step::GateKind;
pub(crate) use step::Gate;

use std::fmt;

use log::trace;

use self::emit::StepEmitter;
use self::state::{CellState, ResetEdge, StepScratch};
use self::step::{walk_step, DirectEvaluator};
use super::TraitNode;
use crate::compiler::{BufferSlot, NodeCompileContext};
use crate::nn::{
    Activation, DimensionOrder, GraphError, MemoryLayout, ModelTransformer, NodeHandle, NodeId,
    NodeTypeDescriptor, TraitActivation,
};
use crate::tensor::Tensor;

/// LSTM原语节点的各输入端口在图中对应的节点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LstmPorts {
    pub input: NodeId,
    pub reset: NodeId,
    /// 按`GateKind::ALL`的顺序
    pub weights: [NodeId; 4],
    pub biases: [NodeId; 4],
}

impl LstmPorts {
    /// 按端口顺序排列的父节点
    pub fn to_parents(&self) -> Vec<NodeId> {
        let mut parents = Vec::with_capacity(Lstm::PORT_NAMES.len());
        parents.push(self.input);
        parents.push(self.reset);
        parents.extend_from_slice(&self.weights);
        parents.extend_from_slice(&self.biases);
        parents
    }

    pub fn from_parents(parents: &[NodeId]) -> Result<Self, GraphError> {
        match *parents {
            [input, reset, w0, w1, w2, w3, b0, b1, b2, b3] => Ok(Self {
                input,
                reset,
                weights: [w0, w1, w2, w3],
                biases: [b0, b1, b2, b3],
            }),
            _ => Err(GraphError::InvalidOperation(format!(
                "LSTM节点需要{}个父节点，实际为{}",
                Lstm::PORT_NAMES.len(),
                parents.len()
            ))),
        }
    }
}

pub(crate) struct Lstm {
    input_size: usize,
    hidden_size: usize,
    activation: Activation,
    recurrent_activation: Activation,
    gates: [Gate; 4],
    input_layout: MemoryLayout,
    output_layout: MemoryLayout,
    input_offsets: Vec<usize>,
    output_offsets: Vec<usize>,
    shape: Vec<usize>,
    state: CellState,
    reset_edge: ResetEdge,
    scratch: StepScratch,
    value: Option<Tensor>,
}

impl Lstm {
    pub(crate) const PORT_NAMES: [&'static str; 10] = [
        "input",
        "resetTrigger",
        GateKind::Input.weights_port_name(),
        GateKind::Forget.weights_port_name(),
        GateKind::Candidate.weights_port_name(),
        GateKind::Output.weights_port_name(),
        GateKind::Input.bias_port_name(),
        GateKind::Forget.bias_port_name(),
        GateKind::Candidate.bias_port_name(),
        GateKind::Output.bias_port_name(),
    ];
    pub(crate) const INPUT_PORT: usize = 0;
    pub(crate) const RESET_PORT: usize = 1;

    pub(crate) fn new(
        parents: &[&NodeHandle],
        activation: Activation,
        recurrent_activation: Activation,
        input_layout: MemoryLayout,
        output_layout: MemoryLayout,
    ) -> Result<Self, GraphError> {
        // 1. 端口数
        if parents.len() != Self::PORT_NAMES.len() {
            return Err(GraphError::InvalidOperation(format!(
                "LSTM节点需要{}个父节点（输入、重置信号、4个门权重、4个门偏置），实际为{}",
                Self::PORT_NAMES.len(),
                parents.len()
            )));
        }

        // 2. 输入与重置信号
        let input_size = input_layout.active_size();
        let hidden_size = output_layout.active_size();
        if input_size == 0 || hidden_size == 0 {
            return Err(GraphError::InvalidOperation(format!(
                "LSTM节点的输入（{}）与隐藏状态（{}）都不能为空",
                input_size, hidden_size
            )));
        }
        let input = parents[Self::INPUT_PORT];
        if input.output_size() != input_layout.memory_size() {
            return Err(GraphError::ShapeMismatch {
                expected: vec![input_layout.memory_size()],
                got: input.value_expected_shape().to_vec(),
                message: "LSTM输入的元素个数须与输入内存布局一致".to_string(),
            });
        }
        let reset = parents[Self::RESET_PORT];
        if reset.output_size() != 1 {
            return Err(GraphError::ShapeMismatch {
                expected: vec![1],
                got: reset.value_expected_shape().to_vec(),
                message: "LSTM的重置信号须为标量".to_string(),
            });
        }

        // 3. 各门的权重与偏置
        let weights_shape = [hidden_size, input_size + hidden_size];
        for kind in GateKind::ALL {
            let weights = parents[kind.weights_port()];
            if weights.value_expected_shape() != weights_shape {
                return Err(GraphError::ShapeMismatch {
                    expected: weights_shape.to_vec(),
                    got: weights.value_expected_shape().to_vec(),
                    message: format!("LSTM端口{}的形状不符", kind.weights_port_name()),
                });
            }
            let bias = parents[kind.bias_port()];
            if bias.value_expected_shape() != [hidden_size] {
                return Err(GraphError::ShapeMismatch {
                    expected: vec![hidden_size],
                    got: bias.value_expected_shape().to_vec(),
                    message: format!("LSTM端口{}的形状不符", kind.bias_port_name()),
                });
            }
        }

        Ok(Self {
            input_size,
            hidden_size,
            activation,
            recurrent_activation,
            gates: Gate::all(activation, recurrent_activation),
            input_offsets: input_layout.active_offsets(),
            output_offsets: output_layout.active_offsets(),
            shape: vec![output_layout.memory_size()],
            input_layout,
            output_layout,
            state: CellState::zeros(hidden_size),
            reset_edge: ResetEdge::default(),
            scratch: StepScratch::new(input_size, hidden_size),
            value: None,
        })
    }

    pub(crate) const fn input_size(&self) -> usize {
        self.input_size
    }

    pub(crate) const fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub(crate) const fn output_layout(&self) -> &MemoryLayout {
        &self.output_layout
    }

    pub(crate) fn input_offsets(&self) -> &[usize] {
        &self.input_offsets
    }

    pub(crate) fn output_offsets(&self) -> &[usize] {
        &self.output_offsets
    }

    /// 当前的隐藏状态h
    pub(crate) fn hidden_state(&self) -> &[f32] {
        self.state.hidden()
    }

    /// 当前的细胞状态c
    pub(crate) fn cell_state(&self) -> &[f32] {
        self.state.cell()
    }
}

impl fmt::Debug for Lstm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lstm")
            .field("input_size", &self.input_size)
            .field("hidden_size", &self.hidden_size)
            .field("activation", &self.activation.name())
            .field("recurrent_activation", &self.recurrent_activation.name())
            .field("input_layout", &self.input_layout)
            .field("output_layout", &self.output_layout)
            .finish_non_exhaustive()
    }
}

impl TraitNode for Lstm {
    fn type_name(&self) -> &'static str {
        "Lstm"
    }

    fn port_names(&self) -> &'static [&'static str] {
        &Self::PORT_NAMES
    }

    fn value_expected_shape(&self) -> &[usize] {
        &self.shape
    }

    fn value(&self) -> Option<&Tensor> {
        self.value.as_ref()
    }

    fn calc_value_by_parents(&mut self, parents: &[&Tensor]) -> Result<(), GraphError> {
        if parents.len() != Self::PORT_NAMES.len() {
            return Err(GraphError::InvalidOperation(format!(
                "LSTM节点需要{}个父节点的值，实际为{}",
                Self::PORT_NAMES.len(),
                parents.len()
            )));
        }
        let reset = parents[Self::RESET_PORT]
            .data_as_slice()
            .first()
            .copied()
            .unwrap_or_default();
        let mut output = vec![0.0; self.output_layout.memory_size()];
        let mut evaluator = DirectEvaluator {
            raw_input: parents[Self::INPUT_PORT].data_as_slice(),
            reset,
            weights: GateKind::ALL.map(|kind| parents[kind.weights_port()].data_as_slice()),
            biases: GateKind::ALL.map(|kind| parents[kind.bias_port()].data_as_slice()),
            input_offsets: &self.input_offsets,
            output_offsets: &self.output_offsets,
            state: &mut self.state,
            reset_edge: &mut self.reset_edge,
            scratch: &mut self.scratch,
            output: &mut output,
        };
        walk_step(&self.gates, self.activation, &mut evaluator)?;
        self.value = Some(Tensor::try_new(&output, &self.shape)?);
        Ok(())
    }

    fn has_state(&self) -> bool {
        true
    }

    fn reset(&mut self) {
        self.state.clear();
        self.reset_edge.clear();
    }

    fn can_accept_input_layout(&self, order: &DimensionOrder) -> bool {
        self.input_layout.logical_dimension_order() == order
    }

    fn compile(&self, ctx: &mut NodeCompileContext<'_>) -> Result<BufferSlot, GraphError> {
        let ports = (0..Self::PORT_NAMES.len())
            .map(|port| ctx.input(port))
            .collect::<Result<Vec<_>, _>>()?;
        let mut step = StepEmitter::new(ctx.emitter(), &ports, self)?;
        walk_step(&self.gates, self.activation, &mut step)?;
        trace!(
            "LSTM节点已生成指令：输入{}，隐藏状态{}，输出位于{}",
            self.input_size,
            self.hidden_size,
            step.output()
        );
        Ok(step.output())
    }

    fn copy(
        &self,
        name: &str,
        parents: &[NodeId],
        transformer: &mut ModelTransformer,
    ) -> Result<NodeId, GraphError> {
        transformer.target_mut().new_lstm_node(
            LstmPorts::from_parents(parents)?,
            self.activation,
            self.recurrent_activation,
            self.input_layout.clone(),
            self.output_layout.clone(),
            Some(name),
        )
    }

    fn write_to_archive(&self) -> Result<NodeTypeDescriptor, GraphError> {
        Err(GraphError::UnsupportedOperation(
            "LSTM原语节点不支持序列化，请序列化分解前的LSTM层节点".to_string(),
        ))
    }
}
