/*
 * @Author       : 老董
 * @Date         : 2026-10-06
 * @Description  : LSTM单步计算的唯一描述
 *
 * 直接求值（DirectEvaluator）与指令生成（StepEmitter）都由`walk_step`驱动，
 * 遍历同一张`LSTM_STEP`表，因此两条路径的运算顺序不可能分叉。
 *
 *   i  = σ(W_i·[x, h] + b_i)
 *   f  = σ(W_f·[x, h] + b_f)
 *   g  = act(W_g·[x, h] + b_g)
 *   o  = σ(W_o·[x, h] + b_o)
 *   c' = f⊙c + i⊙g
 *   h' = o⊙act(c')
 * 其中σ为recurrent_activation，act为activation
 */

use log::debug;
use serde::{Deserialize, Serialize};

use super::state::{CellState, ResetEdge, StepScratch};
use crate::compiler::kernels;
use crate::nn::{Activation, GraphError, TraitActivation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateKind {
    Input,
    Forget,
    Candidate,
    Output,
}

impl GateKind {
    /// 权重/偏置在LSTM层参数中的存放顺序
    pub const ALL: [Self; 4] = [Self::Input, Self::Forget, Self::Candidate, Self::Output];

    pub const fn index(self) -> usize {
        match self {
            Self::Input => 0,
            Self::Forget => 1,
            Self::Candidate => 2,
            Self::Output => 3,
        }
    }

    pub const fn weights_port_name(self) -> &'static str {
        match self {
            Self::Input => "inputWeights",
            Self::Forget => "forgetMeWeights",
            Self::Candidate => "candidateWeights",
            Self::Output => "outputWeights",
        }
    }

    pub const fn bias_port_name(self) -> &'static str {
        match self {
            Self::Input => "inputBias",
            Self::Forget => "forgetMeBias",
            Self::Candidate => "candidateBias",
            Self::Output => "outputBias",
        }
    }

    pub const fn weights_port(self) -> usize {
        2 + self.index()
    }

    pub const fn bias_port(self) -> usize {
        6 + self.index()
    }

    /// 候选门使用主激活函数，其余三个门使用循环激活函数
    pub const fn uses_recurrent_activation(self) -> bool {
        !matches!(self, Self::Candidate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Gate {
    pub(crate) kind: GateKind,
    pub(crate) activation: Activation,
}

impl Gate {
    pub(crate) fn all(activation: Activation, recurrent_activation: Activation) -> [Self; 4] {
        GateKind::ALL.map(|kind| Self {
            kind,
            activation: if kind.uses_recurrent_activation() {
                recurrent_activation
            } else {
                activation
            },
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StepOp {
    ReadInput,
    ResetOnFallingEdge,
    Gate(GateKind),
    UpdateCell,
    UpdateHidden,
    WriteOutput,
    CommitState,
}

pub(crate) const LSTM_STEP: [StepOp; 10] = [
    StepOp::ReadInput,
    StepOp::ResetOnFallingEdge,
    StepOp::Gate(GateKind::Input),
    StepOp::Gate(GateKind::Forget),
    StepOp::Gate(GateKind::Candidate),
    StepOp::Gate(GateKind::Output),
    StepOp::UpdateCell,
    StepOp::UpdateHidden,
    StepOp::WriteOutput,
    StepOp::CommitState,
];

pub(crate) trait StepVisitor {
    /// 按输入布局取出有效区数据
    fn read_input(&mut self) -> Result<(), GraphError>;
    fn reset_on_falling_edge(&mut self) -> Result<(), GraphError>;
    /// 计算门的仿射变换并施加该门的激活函数
    fn gate(&mut self, gate: &Gate) -> Result<(), GraphError>;
    /// c' = f⊙c + i⊙g
    fn update_cell(&mut self) -> Result<(), GraphError>;
    /// h' = o⊙act(c')
    fn update_hidden(&mut self, activation: Activation) -> Result<(), GraphError>;
    /// 按输出布局写出h'（填充区保持为0）
    fn write_output(&mut self) -> Result<(), GraphError>;
    /// h ← h', c ← c'
    fn commit_state(&mut self) -> Result<(), GraphError>;
}

pub(crate) fn walk_step<V: StepVisitor>(
    gates: &[Gate; 4],
    activation: Activation,
    visitor: &mut V,
) -> Result<(), GraphError> {
    for op in LSTM_STEP {
        match op {
            StepOp::ReadInput => visitor.read_input()?,
            StepOp::ResetOnFallingEdge => visitor.reset_on_falling_edge()?,
            StepOp::Gate(kind) => visitor.gate(&gates[kind.index()])?,
            StepOp::UpdateCell => visitor.update_cell()?,
            StepOp::UpdateHidden => visitor.update_hidden(activation)?,
            StepOp::WriteOutput => visitor.write_output()?,
            StepOp::CommitState => visitor.commit_state()?,
        }
    }
    Ok(())
}

/// 在节点自身的状态与临时区上直接完成一步计算
pub(crate) struct DirectEvaluator<'a> {
    pub(crate) raw_input: &'a [f32],
    pub(crate) reset: f32,
    pub(crate) weights: [&'a [f32]; 4],
    pub(crate) biases: [&'a [f32]; 4],
    pub(crate) input_offsets: &'a [usize],
    pub(crate) output_offsets: &'a [usize],
    pub(crate) state: &'a mut CellState,
    pub(crate) reset_edge: &'a mut ResetEdge,
    pub(crate) scratch: &'a mut StepScratch,
    pub(crate) output: &'a mut [f32],
}

impl StepVisitor for DirectEvaluator<'_> {
    fn read_input(&mut self) -> Result<(), GraphError> {
        kernels::gather(self.raw_input, self.input_offsets, &mut self.scratch.input);
        Ok(())
    }

    fn reset_on_falling_edge(&mut self) -> Result<(), GraphError> {
        if self.reset_edge.observe(self.reset) {
            debug!("重置信号出现下降沿，清空LSTM状态");
            self.state.clear();
        }
        Ok(())
    }

    fn gate(&mut self, gate: &Gate) -> Result<(), GraphError> {
        let i = gate.kind.index();
        let out = &mut self.scratch.gates[i];
        kernels::affine_concat(
            self.weights[i],
            self.biases[i],
            &self.scratch.input,
            self.state.hidden(),
            out,
        );
        gate.activation.apply(out);
        Ok(())
    }

    fn update_cell(&mut self) -> Result<(), GraphError> {
        let [input_gate, forget_gate, candidate, _] = &self.scratch.gates;
        kernels::multiply_add(
            forget_gate,
            self.state.cell(),
            input_gate,
            candidate,
            &mut self.scratch.new_cell,
        );
        Ok(())
    }

    fn update_hidden(&mut self, activation: Activation) -> Result<(), GraphError> {
        let scratch = &mut *self.scratch;
        scratch.activated_cell.copy_from_slice(&scratch.new_cell);
        activation.apply(&mut scratch.activated_cell);
        kernels::multiply(
            &scratch.gates[GateKind::Output.index()],
            &scratch.activated_cell,
            &mut scratch.new_hidden,
        );
        Ok(())
    }

    fn write_output(&mut self) -> Result<(), GraphError> {
        kernels::scatter(&self.scratch.new_hidden, self.output_offsets, self.output);
        Ok(())
    }

    fn commit_state(&mut self) -> Result<(), GraphError> {
        self.state
            .commit(&self.scratch.new_hidden, &self.scratch.new_cell);
        Ok(())
    }
}
