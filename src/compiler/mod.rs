/*
 * @Description  : 代码生成后端
 *
 * 节点把自身的计算“编译”为一串作用于预分配缓冲区（arena）的指令，
 * 得到的`Program`在执行期不做任何堆分配，适合部署到资源受限的设备上。
 *
 * - kernels.rs: 数值内核，解释执行与编译执行共用
 * - instruction.rs: 指令集
 * - emitter.rs: 函数构建上下文（分配缓冲区、追加指令）
 * - program.rs: 不可变的指令程序 + 每个实例独立的执行上下文
 * - map_compiler.rs: 把整张计算图编译为`CompiledMap`
 */

mod emitter;
mod instruction;
pub mod kernels;
mod map_compiler;
mod program;

pub use emitter::{BufferSlot, FunctionEmitter};
pub use instruction::Instruction;
pub use map_compiler::{CompiledMap, CompilerOptions, MapCompiler, NodeCompileContext};
pub use program::{ExecutionContext, Program};
