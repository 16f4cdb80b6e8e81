//! # LSTM Compiler
//!
//! `lstm_compiler`是提前编译（AOT）型神经网络编译器中的一环：
//! 一个既能逐步仿真（直接求值，用于验证），又能编译成无堆分配指令序列（用于部署到资源受限设备）的LSTM循环单元节点。
//!
//! 循环（时间上的回边）被藏在节点私有的状态里，因此外围的计算图始终保持无环。
//! 预训练的LSTM层先以“适配节点”的形式接入计算图，再经`refine`分解为原语LSTM节点与若干常量节点，
//! 之后既可由[`nn::Graph::forward`]解释执行，也可由[`compiler::MapCompiler`]编译执行，两条路径数值一致。
//!

pub mod compiler;
pub mod errors;
pub mod nn;
pub mod tensor;
pub mod utils;
