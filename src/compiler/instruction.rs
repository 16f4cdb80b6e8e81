use std::fmt;
use std::sync::Arc;

use super::{kernels, BufferSlot};
use crate::nn::{Activation, GraphError, TraitActivation};

/// 作用于arena的指令。所有操作数都是编译期确定的缓冲区，执行期不做堆分配
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Copy {
        src: BufferSlot,
        dst: BufferSlot,
    },
    /// `dst[i] = src[offsets[i]]`
    Gather {
        src: BufferSlot,
        offsets: Arc<[usize]>,
        dst: BufferSlot,
    },
    /// `dst[offsets[i]] = src[i]`
    Scatter {
        src: BufferSlot,
        offsets: Arc<[usize]>,
        dst: BufferSlot,
    },
    /// `last`中记录上一次的触发值；若本次出现下降沿则清零`targets`，随后更新`last`
    ClearOnFallingEdge {
        trigger: BufferSlot,
        last: BufferSlot,
        targets: Vec<BufferSlot>,
    },
    /// `dst = weights · [first, second] + bias`
    AffineConcat {
        weights: BufferSlot,
        bias: BufferSlot,
        first: BufferSlot,
        second: BufferSlot,
        dst: BufferSlot,
    },
    /// 原地施加激活函数
    Activate {
        activation: Activation,
        data: BufferSlot,
    },
    /// `dst = a ⊙ b`
    Multiply {
        a: BufferSlot,
        b: BufferSlot,
        dst: BufferSlot,
    },
    /// `dst = a ⊙ b + c ⊙ d`
    MultiplyAdd {
        a: BufferSlot,
        b: BufferSlot,
        c: BufferSlot,
        d: BufferSlot,
        dst: BufferSlot,
    },
}

impl Instruction {
    /// 指令读取（且不会写入）的缓冲区
    pub fn reads(&self) -> Vec<BufferSlot> {
        match self {
            Self::Activate { .. } => Vec::new(),
            Self::Copy { src, .. } | Self::Gather { src, .. } | Self::Scatter { src, .. } => {
                vec![*src]
            }
            Self::ClearOnFallingEdge { trigger, .. } => vec![*trigger],
            Self::AffineConcat {
                weights,
                bias,
                first,
                second,
                ..
            } => vec![*weights, *bias, *first, *second],
            Self::Multiply { a, b, .. } => vec![*a, *b],
            Self::MultiplyAdd { a, b, c, d, .. } => vec![*a, *b, *c, *d],
        }
    }

    /// 指令写入的缓冲区
    pub fn writes(&self) -> Vec<BufferSlot> {
        match self {
            Self::Copy { dst, .. }
            | Self::Gather { dst, .. }
            | Self::Scatter { dst, .. }
            | Self::AffineConcat { dst, .. }
            | Self::Multiply { dst, .. }
            | Self::MultiplyAdd { dst, .. } => vec![*dst],
            Self::Activate { data, .. } => vec![*data],
            Self::ClearOnFallingEdge { last, targets, .. } => {
                let mut writes = targets.clone();
                writes.push(*last);
                writes
            }
        }
    }

    pub(super) fn check_lengths(&self) -> Result<(), GraphError> {
        let consistent = match self {
            Self::Activate { .. } => true,
            Self::Copy { src, dst } => src.len == dst.len,
            Self::Gather { src, offsets, dst } => {
                offsets.len() == dst.len && offsets.iter().all(|&o| o < src.len)
            }
            Self::Scatter { src, offsets, dst } => {
                offsets.len() == src.len && offsets.iter().all(|&o| o < dst.len)
            }
            Self::ClearOnFallingEdge {
                trigger,
                last,
                targets,
            } => {
                trigger.len == 1
                    && last.len == 1
                    && targets.iter().all(|target| !target.overlaps(last))
            }
            Self::AffineConcat {
                weights,
                bias,
                first,
                second,
                dst,
            } => weights.len == dst.len * (first.len + second.len) && bias.len == dst.len,
            Self::Multiply { a, b, dst } => a.len == dst.len && b.len == dst.len,
            Self::MultiplyAdd { a, b, c, d, dst } => [a, b, c, d].iter().all(|s| s.len == dst.len),
        };
        if consistent {
            Ok(())
        } else {
            Err(GraphError::InvalidOperation(format!(
                "指令`{}`的操作数长度不一致",
                self
            )))
        }
    }

    /// 在arena上执行本指令。操作数已在`FunctionEmitter::emit`中校验过
    pub(super) fn execute(&self, arena: &mut [f32]) {
        match self {
            Self::Copy { src, dst } => {
                let (out, view) = split_at_slot(arena, *dst);
                out.copy_from_slice(view.slot(*src));
            }
            Self::Gather { src, offsets, dst } => {
                let (out, view) = split_at_slot(arena, *dst);
                kernels::gather(view.slot(*src), offsets, out);
            }
            Self::Scatter { src, offsets, dst } => {
                let (out, view) = split_at_slot(arena, *dst);
                kernels::scatter(view.slot(*src), offsets, out);
            }
            Self::ClearOnFallingEdge {
                trigger,
                last,
                targets,
            } => {
                let current = arena[trigger.offset];
                if kernels::is_falling_edge(arena[last.offset], current) {
                    for target in targets {
                        arena[target.range()].fill(0.0);
                    }
                }
                arena[last.offset] = current;
            }
            Self::AffineConcat {
                weights,
                bias,
                first,
                second,
                dst,
            } => {
                let (out, view) = split_at_slot(arena, *dst);
                kernels::affine_concat(
                    view.slot(*weights),
                    view.slot(*bias),
                    view.slot(*first),
                    view.slot(*second),
                    out,
                );
            }
            Self::Activate { activation, data } => activation.apply(&mut arena[data.range()]),
            Self::Multiply { a, b, dst } => {
                let (out, view) = split_at_slot(arena, *dst);
                kernels::multiply(view.slot(*a), view.slot(*b), out);
            }
            Self::MultiplyAdd { a, b, c, d, dst } => {
                let (out, view) = split_at_slot(arena, *dst);
                kernels::multiply_add(
                    view.slot(*a),
                    view.slot(*b),
                    view.slot(*c),
                    view.slot(*d),
                    out,
                );
            }
        }
    }
}

/// 把arena拆成可写的目标区与只读的其余部分，避免执行期复制源数据
fn split_at_slot(arena: &mut [f32], dst: BufferSlot) -> (&mut [f32], ArenaView<'_>) {
    let (head, rest) = arena.split_at_mut(dst.offset);
    let (out, tail) = rest.split_at_mut(dst.len);
    (
        out,
        ArenaView {
            head,
            tail,
            tail_start: dst.end(),
        },
    )
}

struct ArenaView<'a> {
    head: &'a [f32],
    tail: &'a [f32],
    tail_start: usize,
}

impl<'a> ArenaView<'a> {
    fn slot(&self, slot: BufferSlot) -> &'a [f32] {
        if slot.end() <= self.head.len() {
            &self.head[slot.range()]
        } else if slot.offset >= self.tail_start {
            &self.tail[slot.offset - self.tail_start..slot.end() - self.tail_start]
        } else {
            &[]
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copy { src, dst } => write!(f, "copy {} <- {}", dst, src),
            Self::Gather { src, offsets, dst } => {
                write!(f, "gather {} <- {} ({} offsets)", dst, src, offsets.len())
            }
            Self::Scatter { src, offsets, dst } => {
                write!(f, "scatter {} <- {} ({} offsets)", dst, src, offsets.len())
            }
            Self::ClearOnFallingEdge {
                trigger,
                last,
                targets,
            } => {
                write!(f, "clear_on_falling_edge {} (last {}) ->", trigger, last)?;
                for target in targets {
                    write!(f, " {}", target)?;
                }
                Ok(())
            }
            Self::AffineConcat {
                weights,
                bias,
                first,
                second,
                dst,
            } => write!(
                f,
                "affine {} <- {} * ({}, {}) + {}",
                dst, weights, first, second, bias
            ),
            Self::Activate { activation, data } => {
                write!(f, "{} {}", activation.name(), data)
            }
            Self::Multiply { a, b, dst } => write!(f, "mul {} <- {} * {}", dst, a, b),
            Self::MultiplyAdd { a, b, c, d, dst } => {
                write!(f, "mul_add {} <- {} * {} + {} * {}", dst, a, b, c, d)
            }
        }
    }
}
