use std::sync::Arc;

use super::step::{Gate, GateKind, StepVisitor};
use super::Lstm;
use crate::compiler::{BufferSlot, FunctionEmitter, Instruction};
use crate::nn::{Activation, GraphError};

/// 把单步计算翻译成指令。
/// h、c与上一次的重置信号放在global缓冲区中，跨调用保留；其余都是scratch
pub(crate) struct StepEmitter<'a> {
    emitter: &'a mut FunctionEmitter,
    raw_input: BufferSlot,
    reset: BufferSlot,
    weights: [BufferSlot; 4],
    biases: [BufferSlot; 4],
    input_offsets: Arc<[usize]>,
    output_offsets: Arc<[usize]>,
    input: BufferSlot,
    hidden: BufferSlot,
    cell: BufferSlot,
    last_reset: BufferSlot,
    gates: [BufferSlot; 4],
    new_cell: BufferSlot,
    activated_cell: BufferSlot,
    new_hidden: BufferSlot,
    output: BufferSlot,
}

impl<'a> StepEmitter<'a> {
    /// `ports`为按端口顺序排列的10个输入缓冲区
    pub(crate) fn new(
        emitter: &'a mut FunctionEmitter,
        ports: &[BufferSlot],
        node: &Lstm,
    ) -> Result<Self, GraphError> {
        if ports.len() != Lstm::PORT_NAMES.len() {
            return Err(GraphError::InvalidOperation(format!(
                "LSTM节点需要{}个输入端口，实际为{}",
                Lstm::PORT_NAMES.len(),
                ports.len()
            )));
        }
        let hidden_size = node.hidden_size();
        let input = emitter.scratch(node.input_size());
        let hidden = emitter.global(hidden_size);
        let cell = emitter.global(hidden_size);
        let last_reset = emitter.global(1);
        let gates = std::array::from_fn(|_| emitter.scratch(hidden_size));
        let new_cell = emitter.scratch(hidden_size);
        let activated_cell = emitter.scratch(hidden_size);
        let new_hidden = emitter.scratch(hidden_size);
        let output = emitter.scratch(node.output_layout().memory_size());
        Ok(Self {
            raw_input: ports[Lstm::INPUT_PORT],
            reset: ports[Lstm::RESET_PORT],
            weights: GateKind::ALL.map(|kind| ports[kind.weights_port()]),
            biases: GateKind::ALL.map(|kind| ports[kind.bias_port()]),
            input_offsets: Arc::from(node.input_offsets()),
            output_offsets: Arc::from(node.output_offsets()),
            emitter,
            input,
            hidden,
            cell,
            last_reset,
            gates,
            new_cell,
            activated_cell,
            new_hidden,
            output,
        })
    }

    pub(crate) fn output(&self) -> BufferSlot {
        self.output
    }
}

impl StepVisitor for StepEmitter<'_> {
    fn read_input(&mut self) -> Result<(), GraphError> {
        self.emitter.emit(Instruction::Gather {
            src: self.raw_input,
            offsets: Arc::clone(&self.input_offsets),
            dst: self.input,
        })
    }

    fn reset_on_falling_edge(&mut self) -> Result<(), GraphError> {
        self.emitter.emit(Instruction::ClearOnFallingEdge {
            trigger: self.reset,
            last: self.last_reset,
            targets: vec![self.hidden, self.cell],
        })
    }

    fn gate(&mut self, gate: &Gate) -> Result<(), GraphError> {
        let i = gate.kind.index();
        self.emitter.emit(Instruction::AffineConcat {
            weights: self.weights[i],
            bias: self.biases[i],
            first: self.input,
            second: self.hidden,
            dst: self.gates[i],
        })?;
        self.emitter.emit(Instruction::Activate {
            activation: gate.activation,
            data: self.gates[i],
        })
    }

    fn update_cell(&mut self) -> Result<(), GraphError> {
        self.emitter.emit(Instruction::MultiplyAdd {
            a: self.gates[GateKind::Forget.index()],
            b: self.cell,
            c: self.gates[GateKind::Input.index()],
            d: self.gates[GateKind::Candidate.index()],
            dst: self.new_cell,
        })
    }

    fn update_hidden(&mut self, activation: Activation) -> Result<(), GraphError> {
        self.emitter.emit(Instruction::Copy {
            src: self.new_cell,
            dst: self.activated_cell,
        })?;
        self.emitter.emit(Instruction::Activate {
            activation,
            data: self.activated_cell,
        })?;
        self.emitter.emit(Instruction::Multiply {
            a: self.gates[GateKind::Output.index()],
            b: self.activated_cell,
            dst: self.new_hidden,
        })
    }

    fn write_output(&mut self) -> Result<(), GraphError> {
        self.emitter.emit(Instruction::Scatter {
            src: self.new_hidden,
            offsets: Arc::clone(&self.output_offsets),
            dst: self.output,
        })
    }

    fn commit_state(&mut self) -> Result<(), GraphError> {
        self.emitter.emit(Instruction::Copy {
            src: self.new_hidden,
            dst: self.hidden,
        })?;
        self.emitter.emit(Instruction::Copy {
            src: self.new_cell,
            dst: self.cell,
        })
    }
}
