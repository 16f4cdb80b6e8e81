/*
 * @Description  : LSTM原语节点单元测试
 *
 * 多时间步的参考值与 PyTorch nn.LSTMCell 对照
 * （权重由 PyTorch 的 [input, hidden] 分离布局换算为本crate的 [hidden, input + hidden] 布局）
 */

use approx::assert_abs_diff_eq;

use super::{concrete_lstm, wire_lstm};
use crate::assert_err;
use crate::nn::{
    Activation, DimensionOrder, GateKind, Graph, GraphError, LstmPorts, MemoryLayout, NodeId,
};
use crate::tensor::Tensor;

// ==================== PyTorch 参考常量 ====================

// 多时间步 (input=2, hidden=2, seq_len=3)，每行为 [W_x 的一列, W_h 的一列]
const REF_W_I: &[f32] = &[0.5, 0.2, 0.1, 0.0, 0.3, 0.4, 0.0, 0.1];
const REF_W_F: &[f32] = &[0.3, 0.4, 0.1, 0.0, 0.5, 0.2, 0.0, 0.1];
const REF_W_G: &[f32] = &[0.4, 0.3, 0.2, 0.0, 0.2, 0.5, 0.0, 0.2];
const REF_W_O: &[f32] = &[0.2, 0.5, 0.1, 0.0, 0.4, 0.3, 0.0, 0.1];
const REF_H: [&[f32]; 3] = [
    &[0.12766583, 0.06759029],
    &[0.21817833, 0.20445023],
    &[0.42088586, 0.42253390],
];
const REF_C: [&[f32]; 3] = [
    &[0.23650280, 0.11338077],
    &[0.36411276, 0.37102786],
    &[0.73379391, 0.73829132],
];

fn reference_lstm() -> Result<super::LstmFixture, GraphError> {
    let biases = [
        Tensor::zeros(&[2]),
        Tensor::new(&[1.0, 1.0], &[2]),
        Tensor::zeros(&[2]),
        Tensor::zeros(&[2]),
    ];
    wire_lstm(
        [REF_W_I, REF_W_F, REF_W_G, REF_W_O].map(|w| Tensor::new(w, &[2, 4])),
        biases,
        MemoryLayout::vector(2),
        MemoryLayout::vector(2),
    )
}

// ==================== 构建 ====================

#[test]
fn test_lstm_port_names() -> Result<(), GraphError> {
    let fixture = concrete_lstm()?;
    assert_eq!(
        fixture.graph.get_node_port_names(fixture.lstm)?,
        &[
            "input",
            "resetTrigger",
            "inputWeights",
            "forgetMeWeights",
            "candidateWeights",
            "outputWeights",
            "inputBias",
            "forgetMeBias",
            "candidateBias",
            "outputBias",
        ]
    );
    // 父节点顺序与端口顺序一致
    let parents = fixture.graph.get_node_parents(fixture.lstm)?;
    assert_eq!(parents[0], fixture.input);
    assert_eq!(parents[1], fixture.reset);
    for kind in GateKind::ALL {
        assert_eq!(
            fixture.graph.get_node_name(parents[kind.weights_port()])?,
            kind.weights_port_name()
        );
        assert_eq!(
            fixture.graph.get_node_name(parents[kind.bias_port()])?,
            kind.bias_port_name()
        );
    }
    assert_eq!(fixture.graph.get_node_output_shape(fixture.lstm)?, &[2]);
    Ok(())
}

/// 搭好除LSTM节点外的全部端口，返回(图, 端口)
fn ports_with(
    weight_shape: &[usize],
    bias_shape: &[usize],
    input_len: usize,
    reset_len: usize,
) -> Result<(Graph, LstmPorts), GraphError> {
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[input_len], None)?;
    let reset = graph.new_input_node(&[reset_len], None)?;
    let mut weights = [NodeId(0); 4];
    let mut biases = [NodeId(0); 4];
    for kind in GateKind::ALL {
        let shape: &[usize] = if kind == GateKind::Candidate {
            weight_shape
        } else {
            &[2, 3]
        };
        weights[kind.index()] = graph.new_constant_node(Tensor::zeros(shape), None)?;
        let shape: &[usize] = if kind == GateKind::Output {
            bias_shape
        } else {
            &[2]
        };
        biases[kind.index()] = graph.new_constant_node(Tensor::zeros(shape), None)?;
    }
    Ok((
        graph,
        LstmPorts {
            input,
            reset,
            weights,
            biases,
        },
    ))
}

fn new_lstm(graph: &mut Graph, ports: LstmPorts) -> Result<NodeId, GraphError> {
    graph.new_lstm_node(
        ports,
        Activation::tanh(),
        Activation::sigmoid(),
        MemoryLayout::vector(1),
        MemoryLayout::vector(2),
        None,
    )
}

#[test]
fn test_lstm_creation_validates_ports() -> Result<(), GraphError> {
    // 1. 合法端口
    let (mut graph, ports) = ports_with(&[2, 3], &[2], 1, 1)?;
    let lstm = new_lstm(&mut graph, ports)?;
    assert_eq!(graph.get_node_name(lstm)?, "lstm_1");

    // 2. 权重形状不符
    let (mut graph, ports) = ports_with(&[2, 2], &[2], 1, 1)?;
    assert_err!(
        new_lstm(&mut graph, ports),
        GraphError::ShapeMismatch([2, 3], [2, 2], "LSTM端口candidateWeights的形状不符")
    );

    // 3. 权重转置了也不行
    let (mut graph, ports) = ports_with(&[3, 2], &[2], 1, 1)?;
    assert_err!(
        new_lstm(&mut graph, ports),
        GraphError::ShapeMismatch([2, 3], [3, 2], "LSTM端口candidateWeights的形状不符")
    );

    // 4. 偏置形状不符
    let (mut graph, ports) = ports_with(&[2, 3], &[3], 1, 1)?;
    assert_err!(
        new_lstm(&mut graph, ports),
        GraphError::ShapeMismatch([2], [3], "LSTM端口outputBias的形状不符")
    );

    // 5. 输入大小与布局不符
    let (mut graph, ports) = ports_with(&[2, 3], &[2], 2, 1)?;
    assert_err!(
        new_lstm(&mut graph, ports),
        GraphError::ShapeMismatch([1], [2], "LSTM输入的元素个数须与输入内存布局一致")
    );

    // 6. 重置信号不是标量
    let (mut graph, ports) = ports_with(&[2, 3], &[2], 1, 2)?;
    assert_err!(
        new_lstm(&mut graph, ports),
        GraphError::ShapeMismatch([1], [2], "LSTM的重置信号须为标量")
    );

    // 7. 失败的构建不会在图中留下节点
    assert_eq!(graph.nodes_count(), 10);
    Ok(())
}

#[test]
fn test_lstm_creation_with_unknown_parent() -> Result<(), GraphError> {
    let (mut graph, mut ports) = ports_with(&[2, 3], &[2], 1, 1)?;
    ports.reset = NodeId(999);
    assert_err!(
        new_lstm(&mut graph, ports),
        GraphError::NodeNotFound(id) if *id == NodeId(999)
    );
    Ok(())
}

#[test]
fn test_lstm_ports_from_parents() {
    let parents: Vec<NodeId> = (1..=10).map(NodeId).collect();
    let ports = LstmPorts::from_parents(&parents).unwrap();
    assert_eq!(ports.input, NodeId(1));
    assert_eq!(ports.reset, NodeId(2));
    assert_eq!(ports.weights, [NodeId(3), NodeId(4), NodeId(5), NodeId(6)]);
    assert_eq!(ports.biases, [NodeId(7), NodeId(8), NodeId(9), NodeId(10)]);
    assert_eq!(ports.to_parents(), parents);

    assert_err!(
        LstmPorts::from_parents(&parents[..9]),
        GraphError::InvalidOperation("LSTM节点需要10个父节点，实际为9")
    );
}

// ==================== 数值 ====================

/// 只有候选门有权重：i = f = o = σ(0) = 0.5，g = tanh(x)
#[test]
fn test_lstm_concrete_first_step() -> Result<(), GraphError> {
    let mut fixture = concrete_lstm()?;
    let output = fixture.step(&[1.0], 0.0)?;

    let c = 0.5 * 1.0f32.tanh();
    let h = 0.5 * c.tanh();
    assert_eq!(output.len(), 2);
    for &value in &output {
        assert_abs_diff_eq!(value, h, epsilon = 1e-6);
    }
    let (hidden, cell) = fixture.graph.get_lstm_state(fixture.lstm)?;
    for (&hv, &cv) in hidden.iter().zip(cell) {
        assert_abs_diff_eq!(hv, h, epsilon = 1e-6);
        assert_abs_diff_eq!(cv, c, epsilon = 1e-6);
    }

    // 第二步：c = 0.5·c + 0.5·tanh(1)
    let output = fixture.step(&[1.0], 0.0)?;
    let c2 = 0.5 * c + 0.5 * 1.0f32.tanh();
    assert_abs_diff_eq!(output[0], 0.5 * c2.tanh(), epsilon = 1e-6);
    Ok(())
}

#[test]
fn test_lstm_multi_step_matches_pytorch() -> Result<(), GraphError> {
    let mut fixture = reference_lstm()?;
    let sequence = [[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];

    for (t, x) in sequence.iter().enumerate() {
        let output = fixture.step(x, 0.0)?;
        for (&actual, &expected) in output.iter().zip(REF_H[t]) {
            assert_abs_diff_eq!(actual, expected, epsilon = 1e-5);
        }
        let (_, cell) = fixture.graph.get_lstm_state(fixture.lstm)?;
        for (&actual, &expected) in cell.iter().zip(REF_C[t]) {
            assert_abs_diff_eq!(actual, expected, epsilon = 1e-5);
        }
    }
    Ok(())
}

#[test]
fn test_lstm_output_through_padded_layout() -> Result<(), GraphError> {
    let zeros = || Tensor::zeros(&[2, 3]);
    let candidate = Tensor::new(&[1.0, 0.0, 0.0, 1.0, 0.0, 0.0], &[2, 3]);
    let output_layout = MemoryLayout::new(&[2], &[1], DimensionOrder::canonical(1))?;
    let mut fixture = wire_lstm(
        [zeros(), zeros(), candidate, zeros()],
        std::array::from_fn(|_| Tensor::zeros(&[2])),
        MemoryLayout::vector(1),
        output_layout,
    )?;
    assert_eq!(fixture.graph.get_node_output_shape(fixture.lstm)?, &[4]);

    let output = fixture.step(&[1.0], 0.0)?;
    let h = 0.5 * (0.5 * 1.0f32.tanh()).tanh();
    assert_eq!(output[0], 0.0);
    assert_abs_diff_eq!(output[1], h, epsilon = 1e-6);
    assert_abs_diff_eq!(output[2], h, epsilon = 1e-6);
    assert_eq!(output[3], 0.0);
    Ok(())
}

#[test]
fn test_lstm_input_through_padded_layout() -> Result<(), GraphError> {
    // 输入缓冲区为[pad, x, pad]，只有中间的元素参与计算
    let zeros = || Tensor::zeros(&[2, 3]);
    let candidate = Tensor::new(&[1.0, 0.0, 0.0, 1.0, 0.0, 0.0], &[2, 3]);
    let input_layout = MemoryLayout::new(&[1], &[1], DimensionOrder::canonical(1))?;
    let mut padded = wire_lstm(
        [zeros(), zeros(), candidate.clone(), zeros()],
        std::array::from_fn(|_| Tensor::zeros(&[2])),
        input_layout,
        MemoryLayout::vector(2),
    )?;
    let mut plain = concrete_lstm()?;

    let expected = plain.step(&[0.7], 0.0)?;
    assert_eq!(padded.step(&[9.0, 0.7, -9.0], 0.0)?, expected);
    Ok(())
}

// ==================== 状态与重置 ====================

#[test]
fn test_lstm_reset_on_falling_edge() -> Result<(), GraphError> {
    let mut fixture = concrete_lstm()?;
    let resets = [1.0, 1.0, 0.0, 0.0, 1.0, 0.0];
    let outputs = resets
        .iter()
        .map(|&reset| fixture.step(&[1.0], reset))
        .collect::<Result<Vec<_>, _>>()?;

    // 只在第3、6步之前清空状态，因此这两步与第1步完全相同
    assert_eq!(outputs[2], outputs[0]);
    assert_eq!(outputs[5], outputs[0]);
    // 其余各步都延续了之前的状态
    assert_ne!(outputs[1], outputs[0]);
    assert_eq!(outputs[3], outputs[1]);
    assert_ne!(outputs[4], outputs[0]);
    assert_ne!(outputs[4], outputs[1]);
    Ok(())
}

#[test]
fn test_lstm_no_reset_when_line_starts_low() -> Result<(), GraphError> {
    // 上一次信号的初始值为0，因此一开始就为0的信号不构成下降沿
    let mut low = concrete_lstm()?;
    let mut high = concrete_lstm()?;
    for _ in 0..3 {
        assert_eq!(low.step(&[1.0], 0.0)?, high.step(&[1.0], 1.0)?);
    }
    Ok(())
}

#[test]
fn test_lstm_state_persists_between_steps() -> Result<(), GraphError> {
    let mut fixture = concrete_lstm()?;
    let first = fixture.step(&[1.0], 0.0)?;
    let second = fixture.step(&[1.0], 0.0)?;
    assert_ne!(first, second);

    // 显式重置后与全新节点一致
    fixture.graph.reset_node(fixture.lstm)?;
    assert_eq!(fixture.step(&[1.0], 0.0)?, first);

    // 重置是幂等的
    fixture.graph.reset_node(fixture.lstm)?;
    fixture.graph.reset_node(fixture.lstm)?;
    let (hidden, cell) = fixture.graph.get_lstm_state(fixture.lstm)?;
    assert!(hidden.iter().chain(cell).all(|&v| v == 0.0));
    Ok(())
}

#[test]
fn test_lstm_explicit_reset_clears_edge_tracker() -> Result<(), GraphError> {
    let mut fixture = concrete_lstm()?;
    fixture.step(&[1.0], 1.0)?;
    fixture.graph.reset_all_states();
    let after_reset = fixture.step(&[1.0], 0.0)?;
    // 重置后上一次信号回到0，这里不会再触发一次清空
    let next = fixture.step(&[1.0], 0.0)?;
    assert_ne!(after_reset, next);

    let mut fresh = concrete_lstm()?;
    assert_eq!(fresh.step(&[1.0], 0.0)?, after_reset);
    assert_eq!(fresh.step(&[1.0], 0.0)?, next);
    Ok(())
}

#[test]
fn test_lstm_is_deterministic() -> Result<(), GraphError> {
    let inputs = [[1.0, -0.5], [0.25, 0.75], [-1.0, 0.0], [0.5, 0.5]];
    let resets = [0.0, 1.0, 0.0, 0.0];
    let mut runs = Vec::new();
    for _ in 0..2 {
        let mut fixture = reference_lstm()?;
        let outputs = inputs
            .iter()
            .zip(resets)
            .map(|(x, reset)| fixture.step(x, reset))
            .collect::<Result<Vec<_>, _>>()?;
        runs.push(outputs);
    }
    assert_eq!(runs[0], runs[1]);
    Ok(())
}

#[test]
fn test_lstm_state_queries() -> Result<(), GraphError> {
    let fixture = concrete_lstm()?;
    let graph = &fixture.graph;
    assert!(graph.node_has_state(fixture.lstm)?);
    assert!(!graph.node_has_state(fixture.input)?);
    assert_eq!(graph.stateful_nodes(), vec![fixture.lstm]);
    assert_err!(
        graph.get_lstm_state(fixture.input),
        GraphError::InvalidOperation(msg) if msg.contains("不是LSTM原语节点")
    );
    Ok(())
}

#[test]
fn test_lstm_layout_contract() -> Result<(), GraphError> {
    let zeros = || Tensor::zeros(&[2, 8]);
    let input_layout = MemoryLayout::new(&[2, 3], &[0, 0], DimensionOrder::new(&[1, 0])?)?;
    let fixture = wire_lstm(
        [zeros(), zeros(), zeros(), zeros()],
        std::array::from_fn(|_| Tensor::zeros(&[2])),
        input_layout,
        MemoryLayout::vector(2),
    )?;
    let graph = &fixture.graph;
    assert!(graph.can_node_accept_input_layout(fixture.lstm, &DimensionOrder::new(&[1, 0])?)?);
    assert!(!graph.can_node_accept_input_layout(fixture.lstm, &DimensionOrder::canonical(2))?);
    assert!(!graph.can_node_accept_input_layout(fixture.lstm, &DimensionOrder::canonical(3))?);
    // 其他节点不限制布局
    assert!(graph.can_node_accept_input_layout(fixture.input, &DimensionOrder::canonical(3))?);
    Ok(())
}

#[test]
fn test_lstm_with_softmax_gate() -> Result<(), GraphError> {
    // 以softmax作为主激活函数时，候选向量整体归一化
    let mut graph = Graph::new();
    let input = graph.new_input_node(&[1], None)?;
    let reset = graph.new_input_node(&[1], None)?;
    let candidate = graph.new_constant_node(
        Tensor::new(&[1.0, 0.0, 0.0, 2.0, 0.0, 0.0], &[2, 3]),
        None,
    )?;
    let zero_w = graph.new_constant_node(Tensor::zeros(&[2, 3]), None)?;
    let zero_b = graph.new_constant_node(Tensor::zeros(&[2]), None)?;
    let lstm = graph.new_lstm_node(
        LstmPorts {
            input,
            reset,
            weights: [zero_w, zero_w, candidate, zero_w],
            biases: [zero_b; 4],
        },
        Activation::softmax(),
        Activation::sigmoid(),
        MemoryLayout::vector(1),
        MemoryLayout::vector(2),
        None,
    )?;
    graph.set_node_value(input, &Tensor::new(&[1.0], &[1]))?;
    graph.set_node_value(reset, &Tensor::new(&[0.0], &[1]))?;
    graph.forward(lstm)?;

    let (_, cell) = graph.get_lstm_state(lstm)?;
    let e1 = 1.0f32.exp();
    let e2 = 2.0f32.exp();
    assert_abs_diff_eq!(cell[0], 0.5 * e1 / (e1 + e2), epsilon = 1e-6);
    assert_abs_diff_eq!(cell[1], 0.5 * e2 / (e1 + e2), epsilon = 1e-6);
    assert_abs_diff_eq!(cell[0] + cell[1], 0.5, epsilon = 1e-6);
    Ok(())
}
