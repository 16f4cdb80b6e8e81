use std::fmt::Write;

use super::{BufferSlot, Instruction};
use crate::nn::GraphError;

/// 编译产物：不可变的指令序列及arena的初始布局。
/// 可被多个`ExecutionContext`共享，各上下文之间互不影响
#[derive(Debug)]
pub struct Program {
    name: String,
    instructions: Vec<Instruction>,
    arena_len: usize,
    init: Vec<(BufferSlot, Vec<f32>)>,
    state: Vec<BufferSlot>,
}

/// 一次独立的执行实例：持有全部缓冲区（含持久状态）
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionContext {
    arena: Vec<f32>,
}

impl Program {
    pub(super) fn new(
        name: String,
        instructions: Vec<Instruction>,
        arena_len: usize,
        init: Vec<(BufferSlot, Vec<f32>)>,
        state: Vec<BufferSlot>,
    ) -> Self {
        Self {
            name,
            instructions,
            arena_len,
            init,
            state,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn arena_len(&self) -> usize {
        self.arena_len
    }

    /// 跨调用保留、`reset_state`时清零的缓冲区
    pub fn state_slots(&self) -> &[BufferSlot] {
        &self.state
    }

    pub fn new_context(&self) -> ExecutionContext {
        let mut arena = vec![0.0; self.arena_len];
        for (slot, data) in &self.init {
            arena[slot.range()].copy_from_slice(data);
        }
        ExecutionContext { arena }
    }

    /// 执行一次。不做堆分配；`ctx`须由本程序的`new_context`创建
    pub fn run(&self, ctx: &mut ExecutionContext) -> Result<(), GraphError> {
        self.check_context(ctx)?;
        self.execute(ctx);
        Ok(())
    }

    pub fn reset_state(&self, ctx: &mut ExecutionContext) -> Result<(), GraphError> {
        self.check_context(ctx)?;
        self.clear_state(ctx);
        Ok(())
    }

    /// 调用方保证`ctx`由本程序创建
    pub(super) fn execute(&self, ctx: &mut ExecutionContext) {
        for instruction in &self.instructions {
            instruction.execute(&mut ctx.arena);
        }
    }

    pub(super) fn clear_state(&self, ctx: &mut ExecutionContext) {
        for slot in &self.state {
            ctx.arena[slot.range()].fill(0.0);
        }
    }

    fn check_context(&self, ctx: &ExecutionContext) -> Result<(), GraphError> {
        if ctx.arena.len() != self.arena_len {
            return Err(GraphError::DimensionMismatch {
                expected: self.arena_len,
                got: ctx.arena.len(),
                message: format!("执行上下文的arena长度与函数{}不符", self.name),
            });
        }
        Ok(())
    }

    /// 人类可读的指令清单
    pub fn listing(&self) -> String {
        let mut out = format!("fn {}(arena: [f32; {}]) {{\n", self.name, self.arena_len);
        for instruction in &self.instructions {
            let _ = writeln!(out, "    {}", instruction);
        }
        out.push('}');
        out
    }
}

impl ExecutionContext {
    /// 越界时返回空切片
    pub fn slot(&self, slot: BufferSlot) -> &[f32] {
        self.arena.get(slot.range()).unwrap_or_default()
    }

    pub fn slot_mut(&mut self, slot: BufferSlot) -> &mut [f32] {
        self.arena.get_mut(slot.range()).unwrap_or_default()
    }
}
