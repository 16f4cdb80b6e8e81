use std::fmt;
use std::ops::Range;

use log::trace;

use super::{Instruction, Program};
use crate::nn::GraphError;

/// arena中的一段连续缓冲区
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferSlot {
    pub offset: usize,
    pub len: usize,
}

impl BufferSlot {
    pub const fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    pub const fn end(&self) -> usize {
        self.offset + self.len
    }

    pub const fn range(&self) -> Range<usize> {
        self.offset..self.end()
    }

    pub const fn overlaps(&self, other: &Self) -> bool {
        self.len > 0 && other.len > 0 && self.offset < other.end() && other.offset < self.end()
    }
}

impl fmt::Display for BufferSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{}]", self.offset, self.end())
    }
}

/// 正在构建的函数：负责分配arena中的缓冲区并追加指令。
///
/// 缓冲区按用途分为四类：
/// - input: 由调用方在每次执行前写入
/// - constant: 编译期确定的数据（如门权重），随程序一起初始化
/// - global: 跨调用保留的持久状态（如LSTM的h、c），`reset_state`时清零
/// - scratch: 单次调用内的临时区
#[derive(Debug)]
pub struct FunctionEmitter {
    name: String,
    arena_len: usize,
    init: Vec<(BufferSlot, Vec<f32>)>,
    state: Vec<BufferSlot>,
    instructions: Vec<Instruction>,
}

impl FunctionEmitter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            arena_len: 0,
            init: Vec::new(),
            state: Vec::new(),
            instructions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn allocate(&mut self, len: usize) -> BufferSlot {
        let slot = BufferSlot::new(self.arena_len, len);
        self.arena_len += len;
        slot
    }

    /// `initial`长度与`len`一致时作为该输入的初始值
    pub fn input(&mut self, len: usize, initial: Option<&[f32]>) -> BufferSlot {
        let slot = self.allocate(len);
        if let Some(data) = initial.filter(|data| data.len() == len) {
            self.init.push((slot, data.to_vec()));
        }
        slot
    }

    pub fn constant(&mut self, data: &[f32]) -> BufferSlot {
        let slot = self.allocate(data.len());
        self.init.push((slot, data.to_vec()));
        slot
    }

    pub fn global(&mut self, len: usize) -> BufferSlot {
        let slot = self.allocate(len);
        self.state.push(slot);
        slot
    }

    pub fn scratch(&mut self, len: usize) -> BufferSlot {
        self.allocate(len)
    }

    /// 追加一条指令。越界、长度不一致或目标与源重叠的指令会被拒绝，
    /// 因此`Program::run`执行时无需再做检查
    pub fn emit(&mut self, instruction: Instruction) -> Result<(), GraphError> {
        let reads = instruction.reads();
        let writes = instruction.writes();
        for slot in reads.iter().chain(&writes) {
            if slot.end() > self.arena_len {
                return Err(GraphError::InvalidOperation(format!(
                    "指令`{}`访问的缓冲区{}越界（arena长度为{}）",
                    instruction, slot, self.arena_len
                )));
            }
        }
        for dst in &writes {
            if let Some(src) = reads.iter().find(|src| dst.overlaps(src)) {
                return Err(GraphError::InvalidOperation(format!(
                    "指令`{}`的目标{}与源{}重叠",
                    instruction, dst, src
                )));
            }
        }
        instruction.check_lengths()?;
        trace!("{}: {}", self.name, instruction);
        self.instructions.push(instruction);
        Ok(())
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn finish(self) -> Program {
        Program::new(
            self.name,
            self.instructions,
            self.arena_len,
            self.init,
            self.state,
        )
    }
}
