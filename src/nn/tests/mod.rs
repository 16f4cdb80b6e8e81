mod node_lstm;

use crate::nn::{
    Activation, GateKind, Graph, GraphError, LstmLayer, LstmPorts, MemoryLayout, NodeId,
};
use crate::tensor::Tensor;

/// 一张只含单个LSTM原语节点的图，输入与重置信号都是输入节点
pub(super) struct LstmFixture {
    pub(super) graph: Graph,
    pub(super) input: NodeId,
    pub(super) reset: NodeId,
    pub(super) lstm: NodeId,
}

impl LstmFixture {
    /// 设置本步的输入与重置信号，前向传播一步并返回LSTM节点的输出
    pub(super) fn step(&mut self, x: &[f32], reset: f32) -> Result<Vec<f32>, GraphError> {
        let input_shape = self.graph.get_node_output_shape(self.input)?.to_vec();
        self.graph
            .set_node_value(self.input, &Tensor::new(x, &input_shape))?;
        self.graph
            .set_node_value(self.reset, &Tensor::new(&[reset], &[1]))?;
        self.graph.forward(self.lstm)?;
        Ok(self
            .graph
            .get_node_value(self.lstm)?
            .map(Tensor::to_vec)
            .unwrap_or_default())
    }
}

/// 按给定的各门权重/偏置（顺序同`GateKind::ALL`）直接接出一个LSTM原语节点
pub(super) fn wire_lstm(
    weights: [Tensor; 4],
    biases: [Tensor; 4],
    input_layout: MemoryLayout,
    output_layout: MemoryLayout,
) -> Result<LstmFixture, GraphError> {
    let mut graph = Graph::with_name("lstm_fixture");
    let input = graph.new_input_node(&[input_layout.memory_size()], Some("x"))?;
    let reset = graph.new_input_node(&[1], Some("reset"))?;
    let mut weight_ids = [NodeId(0); 4];
    let mut bias_ids = [NodeId(0); 4];
    for (kind, (w, b)) in GateKind::ALL.into_iter().zip(weights.into_iter().zip(biases)) {
        weight_ids[kind.index()] = graph.new_constant_node(w, Some(kind.weights_port_name()))?;
        bias_ids[kind.index()] = graph.new_constant_node(b, Some(kind.bias_port_name()))?;
    }
    let lstm = graph.new_lstm_node(
        LstmPorts {
            input,
            reset,
            weights: weight_ids,
            biases: bias_ids,
        },
        Activation::tanh(),
        Activation::sigmoid(),
        input_layout,
        output_layout,
        Some("lstm"),
    )?;
    Ok(LstmFixture {
        graph,
        input,
        reset,
        lstm,
    })
}

/// hidden=2、input=1，除候选门输入列的权重为[1, 1]外其余全为0
pub(super) fn concrete_lstm() -> Result<LstmFixture, GraphError> {
    let zeros = || Tensor::zeros(&[2, 3]);
    let candidate = Tensor::new(&[1.0, 0.0, 0.0, 1.0, 0.0, 0.0], &[2, 3]);
    wire_lstm(
        [zeros(), zeros(), candidate, zeros()],
        std::array::from_fn(|_| Tensor::zeros(&[2])),
        MemoryLayout::vector(1),
        MemoryLayout::vector(2),
    )
}

/// 用固定种子生成一个随机的LSTM层
pub(super) fn random_layer(input_size: usize, hidden_size: usize, seed: u64) -> LstmLayer {
    let weights = Tensor::new_uniform_seeded(
        -1.0,
        1.0,
        &[4 * hidden_size, input_size + hidden_size],
        seed,
    );
    let biases = Tensor::new_uniform_seeded(-0.5, 0.5, &[4 * hidden_size], seed + 1);
    LstmLayer::new(
        input_size,
        hidden_size,
        weights,
        biases,
        Activation::tanh(),
        Activation::sigmoid(),
    )
    .unwrap()
}

/// 图中有一个LSTM层适配节点：x -> lstm_layer(x, reset)
pub(super) fn layer_graph(layer: LstmLayer) -> Result<(Graph, NodeId, NodeId, NodeId), GraphError> {
    let mut graph = Graph::with_name("layer_graph");
    let input = graph.new_input_node(&[layer.input_layout().memory_size()], Some("x"))?;
    let reset = graph.new_input_node(&[1], Some("reset"))?;
    let node = graph.new_lstm_layer_node(input, reset, layer, Some("lstm"))?;
    Ok((graph, input, reset, node))
}
