/*
 * IT-1: LSTM层从存档到部署的完整流程
 *
 * 流程：
 *   LstmLayer ──→ [适配节点] ──save/load──→ [refine] ──→ 原语LSTM + 8个常量
 *                                                │
 *                              ┌─────────────────┴─────────────────┐
 *                         Graph::forward                    MapCompiler::compile
 *                         （直接求值）                        （指令执行）
 *
 * 验收标准：
 *   1. 随机配置、随机输入与重置序列下，两条路径的输出逐位一致
 *   2. 读回的存档与原图行为一致
 */

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use lstm_compiler::compiler::MapCompiler;
use lstm_compiler::nn::{Activation, Graph, GraphError, LstmLayer, NodeId};
use lstm_compiler::tensor::Tensor;

fn build_graph(seed: u64) -> Result<Graph, GraphError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let input_size = rng.gen_range(1..=8);
    let hidden_size = rng.gen_range(1..=8);
    let layer = LstmLayer::new(
        input_size,
        hidden_size,
        Tensor::new_uniform_seeded(
            -1.0,
            1.0,
            &[4 * hidden_size, input_size + hidden_size],
            rng.r#gen(),
        ),
        Tensor::new_uniform_seeded(-1.0, 1.0, &[4 * hidden_size], rng.r#gen()),
        Activation::tanh(),
        Activation::sigmoid(),
    )?;

    let mut graph = Graph::with_name(&format!("lstm_{seed}"));
    let input = graph.new_input_node(&[input_size], Some("x"))?;
    let reset = graph.new_input_node(&[1], Some("reset"))?;
    graph.new_lstm_layer_node(input, reset, layer, Some("lstm"))?;
    Ok(graph)
}

fn node(graph: &Graph, name: &str) -> NodeId {
    graph
        .get_node_id(name)
        .unwrap_or_else(|| panic!("找不到名为{name}的节点"))
}

#[test]
fn test_direct_and_compiled_paths_agree() -> Result<(), GraphError> {
    for seed in 0..16 {
        // 经JSON存档走一遍，验证存档后的图同样可用
        let graph = Graph::from_json(&build_graph(seed)?.to_json()?)?;
        let mut refined = graph.refine()?;
        let (input, reset, lstm) = (
            node(&refined, "x"),
            node(&refined, "reset"),
            node(&refined, "lstm"),
        );
        let mut compiled = MapCompiler::default().compile(&refined, lstm)?;

        let input_len = refined.get_node_output_shape(input)?[0];
        let mut rng = StdRng::seed_from_u64(1000 + seed);
        for step in 0..32 {
            let x: Vec<f32> = (0..input_len).map(|_| rng.gen_range(-2.0..2.0)).collect();
            let reset_value = if rng.gen_bool(0.2) { 1.0 } else { 0.0 };

            refined.set_node_value(input, &Tensor::new(&x, &[input_len]))?;
            refined.set_node_value(reset, &Tensor::new(&[reset_value], &[1]))?;
            refined.forward(lstm)?;
            let expected = refined.get_node_value(lstm)?.unwrap().to_vec();

            compiled.set_input(input, &x)?;
            compiled.set_input(reset, &[reset_value])?;
            assert_eq!(
                compiled.compute(),
                expected.as_slice(),
                "seed={seed}, step={step}"
            );
        }
    }
    Ok(())
}

#[test]
fn test_binary_archive_preserves_behaviour() -> Result<(), GraphError> {
    let graph = build_graph(99)?;
    let restored = Graph::from_bytes(&graph.to_bytes()?)?;

    let mut outputs = Vec::new();
    for graph in [graph, restored] {
        let refined = graph.refine()?;
        let mut compiled = MapCompiler::default().compile(&refined, node(&refined, "lstm"))?;
        let input = node(&refined, "x");
        let input_len = refined.get_node_output_shape(input)?[0];
        let mut run = Vec::new();
        for t in 0..10 {
            compiled.set_input(input, &vec![t as f32 * 0.1; input_len])?;
            run.push(compiled.compute().to_vec());
        }
        outputs.push(run);
    }
    assert_eq!(outputs[0], outputs[1]);
    Ok(())
}
