mod constant;
mod input;
mod lstm;
mod lstm_layer;

pub(crate) use constant::Constant;
pub(crate) use input::Input;
pub(crate) use lstm::{Gate, Lstm};
pub use lstm::{GateKind, LstmPorts};
pub(crate) use lstm_layer::LstmLayerNode;

use enum_dispatch::enum_dispatch;

use crate::compiler::{BufferSlot, NodeCompileContext};
use crate::nn::{DimensionOrder, GraphError, ModelTransformer, NodeId, NodeTypeDescriptor};
use crate::tensor::Tensor;

#[enum_dispatch]
#[derive(Debug)]
pub(crate) enum NodeType {
    Input(Input),
    Constant(Constant),
    LstmLayerNode(LstmLayerNode),
    Lstm(Lstm),
}

#[enum_dispatch(NodeType)]
pub(crate) trait TraitNode {
    fn type_name(&self) -> &'static str;

    /// 输入端口名称，顺序与`Graph`中记录的父节点顺序一致
    fn port_names(&self) -> &'static [&'static str];

    fn value_expected_shape(&self) -> &[usize];

    fn value(&self) -> Option<&Tensor>;

    fn set_value(&mut self, _value: &Tensor) -> Result<(), GraphError> {
        Err(GraphError::InvalidOperation(format!(
            "{}节点的值不应该被手动设置",
            self.type_name()
        )))
    }

    // 根据父节点的值计算本节点的值（注意：该接口只在Graph中使用，调用前所有父节点的值都已被计算过了）
    fn calc_value_by_parents(&mut self, parents: &[&Tensor]) -> Result<(), GraphError>;

    /// 输出是否依赖调用历史（而不仅仅是当前输入）。
    /// 有状态的节点不能被复制、合并，也不能打乱其相继调用的先后顺序
    fn has_state(&self) -> bool {
        false
    }

    /// 清除节点内部状态（无状态节点什么也不做）
    fn reset(&mut self) {}

    fn can_accept_input_layout(&self, _order: &DimensionOrder) -> bool {
        true
    }

    fn is_compilable(&self) -> bool {
        true
    }

    /// 向`ctx`中的函数追加指令，返回本节点输出所在的缓冲区
    fn compile(&self, ctx: &mut NodeCompileContext<'_>) -> Result<BufferSlot, GraphError>;

    /// 在变换目标图中创建一个等价节点（`parents`已映射到目标图）
    fn copy(
        &self,
        name: &str,
        parents: &[NodeId],
        transformer: &mut ModelTransformer,
    ) -> Result<NodeId, GraphError>;

    /// 在变换目标图中把本节点替换为等价的原语子图，返回子图的输出节点；
    /// 默认无需分解，直接复制
    fn refine(
        &self,
        name: &str,
        parents: &[NodeId],
        transformer: &mut ModelTransformer,
    ) -> Result<NodeId, GraphError> {
        self.copy(name, parents, transformer)
    }

    fn write_to_archive(&self) -> Result<NodeTypeDescriptor, GraphError>;
}
