use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use super::{BufferSlot, ExecutionContext, FunctionEmitter, Program};
use crate::nn::{Graph, GraphError, NodeId, NodeType, TraitNode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerOptions {
    /// 生成函数的名称
    pub function_name: String,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            function_name: "predict".to_string(),
        }
    }
}

/// 单个节点编译时可见的上下文：正在构建的函数及其各输入端口所在的缓冲区
pub struct NodeCompileContext<'a> {
    emitter: &'a mut FunctionEmitter,
    inputs: &'a [BufferSlot],
}

impl<'a> NodeCompileContext<'a> {
    pub fn new(emitter: &'a mut FunctionEmitter, inputs: &'a [BufferSlot]) -> Self {
        Self { emitter, inputs }
    }

    pub fn emitter(&mut self) -> &mut FunctionEmitter {
        &mut *self.emitter
    }

    /// 第`port`个输入端口（与父节点顺序一致）
    pub fn input(&self, port: usize) -> Result<BufferSlot, GraphError> {
        self.inputs.get(port).copied().ok_or_else(|| {
            GraphError::InvalidOperation(format!(
                "输入端口{}不存在（共{}个端口）",
                port,
                self.inputs.len()
            ))
        })
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }
}

/// 把计算图中某个输出节点及其全部祖先编译为一个`Program`
#[derive(Debug, Clone, Default)]
pub struct MapCompiler {
    options: CompilerOptions,
}

impl MapCompiler {
    pub fn new(options: CompilerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn compile(&self, graph: &Graph, output: NodeId) -> Result<CompiledMap, GraphError> {
        let mut emitter = FunctionEmitter::new(&self.options.function_name);
        let mut slots: HashMap<NodeId, BufferSlot> = HashMap::new();
        let mut inputs = HashMap::new();

        for id in graph.topological_order(&[output])? {
            let node = graph.get_node(id)?;
            if !node.node_type().is_compilable() {
                return Err(GraphError::InvalidOperation(format!(
                    "{}不能直接编译，请先对计算图调用refine",
                    node
                )));
            }
            let parent_slots = graph
                .get_node_parents(id)?
                .iter()
                .map(|parent| {
                    slots
                        .get(parent)
                        .copied()
                        .ok_or(GraphError::NodeNotFound(*parent))
                })
                .collect::<Result<Vec<_>, _>>()?;
            let mut ctx = NodeCompileContext::new(&mut emitter, &parent_slots);
            let slot = node.node_type().compile(&mut ctx)?;
            trace!("{}的输出位于{}", node, slot);
            if matches!(node.node_type(), NodeType::Input(_)) {
                inputs.insert(id, slot);
            }
            slots.insert(id, slot);
        }

        let output_slot = slots
            .get(&output)
            .copied()
            .ok_or(GraphError::NodeNotFound(output))?;
        let program = Arc::new(emitter.finish());
        debug!(
            "已将计算图{}编译为函数{}：{}条指令，arena长度{}",
            graph.name(),
            program.name(),
            program.instructions().len(),
            program.arena_len()
        );
        Ok(CompiledMap::new(program, inputs, output_slot))
    }
}

/// 编译后的计算图：共享的`Program`加上本实例私有的执行上下文（含持久状态）。
/// 多个实例可以在不同线程中各自执行
#[derive(Debug)]
pub struct CompiledMap {
    program: Arc<Program>,
    context: ExecutionContext,
    inputs: HashMap<NodeId, BufferSlot>,
    output: BufferSlot,
}

impl CompiledMap {
    fn new(program: Arc<Program>, inputs: HashMap<NodeId, BufferSlot>, output: BufferSlot) -> Self {
        Self {
            context: program.new_context(),
            program,
            inputs,
            output,
        }
    }

    /// 基于同一`Program`创建一个全新的实例（状态清零，输入取编译时的初始值）
    pub fn new_instance(&self) -> Self {
        Self::new(Arc::clone(&self.program), self.inputs.clone(), self.output)
    }

    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    pub fn input_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<_> = self.inputs.keys().copied().collect();
        nodes.sort();
        nodes
    }

    pub fn set_input(&mut self, node: NodeId, data: &[f32]) -> Result<(), GraphError> {
        let slot = *self.inputs.get(&node).ok_or(GraphError::NodeNotFound(node))?;
        if slot.len != data.len() {
            return Err(GraphError::ShapeMismatch {
                expected: vec![slot.len],
                got: vec![data.len()],
                message: format!("输入节点{}的数据长度不符", node),
            });
        }
        self.context.slot_mut(slot).copy_from_slice(data);
        Ok(())
    }

    /// 执行一次并返回输出
    pub fn compute(&mut self) -> &[f32] {
        self.program.execute(&mut self.context);
        self.context.slot(self.output)
    }

    /// 上一次执行的输出
    pub fn output(&self) -> &[f32] {
        self.context.slot(self.output)
    }

    pub fn reset_state(&mut self) {
        self.program.clear_state(&mut self.context);
    }
}
