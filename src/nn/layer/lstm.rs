/*
 * @Author       : 老董
 * @Date         : 2026-01-20
 * @LastEditors  : 老董
 * @LastEditTime : 2026-10-08
 * @Description  : LSTM 层 - 预训练LSTM层的全部参数
 *
 * 公式:
 *   i_t = σ(W_i · [x_t, h_{t-1}] + b_i)   # 输入门
 *   f_t = σ(W_f · [x_t, h_{t-1}] + b_f)   # 遗忘门
 *   g_t = act(W_g · [x_t, h_{t-1}] + b_g) # 候选细胞
 *   o_t = σ(W_o · [x_t, h_{t-1}] + b_o)   # 输出门
 *   c_t = f_t ⊙ c_{t-1} + i_t ⊙ g_t       # 细胞状态
 *   h_t = o_t ⊙ act(c_t)                  # 隐藏状态
 *
 * 权重布局:
 * - weights: [4 * hidden_size, input_size + hidden_size]，按输入门、遗忘门、候选细胞、输出门的顺序堆叠
 * - biases: [4 * hidden_size]，顺序同上
 */

use serde::{Deserialize, Serialize};

use crate::nn::{Activation, GateKind, GraphError, MemoryLayout};
use crate::tensor::Tensor;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstmLayer {
    input_size: usize,
    hidden_size: usize,
    weights: Tensor,
    biases: Tensor,
    activation: Activation,
    recurrent_activation: Activation,
    input_layout: MemoryLayout,
    output_layout: MemoryLayout,
}

impl LstmLayer {
    /// 创建 LSTM 层，输入输出均为无填充的向量布局
    ///
    /// # 参数
    /// - `input_size`: 输入特征维度
    /// - `hidden_size`: 隐藏状态维度
    /// - `weights`: 形状 [4 * `hidden_size`, `input_size` + `hidden_size`]
    /// - `biases`: 形状 [4 * `hidden_size`]
    /// - `activation`: 候选细胞与隐藏状态输出所用的激活函数（通常为tanh）
    /// - `recurrent_activation`: 输入门、遗忘门、输出门所用的激活函数（通常为sigmoid）
    pub fn new(
        input_size: usize,
        hidden_size: usize,
        weights: Tensor,
        biases: Tensor,
        activation: Activation,
        recurrent_activation: Activation,
    ) -> Result<Self, GraphError> {
        let layer = Self {
            input_size,
            hidden_size,
            weights,
            biases,
            activation,
            recurrent_activation,
            input_layout: MemoryLayout::vector(input_size),
            output_layout: MemoryLayout::vector(hidden_size),
        };
        layer.validate()?;
        Ok(layer)
    }

    /// 替换输入/输出端口的内存布局（如带填充的输出）
    pub fn with_layouts(
        mut self,
        input_layout: MemoryLayout,
        output_layout: MemoryLayout,
    ) -> Result<Self, GraphError> {
        self.input_layout = input_layout;
        self.output_layout = output_layout;
        self.validate()?;
        Ok(self)
    }

    /// 检查参数形状与布局是否自洽；从存档读入后也会调用
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.input_size == 0 || self.hidden_size == 0 {
            return Err(GraphError::InvalidOperation(format!(
                "LSTM层的输入维度（{}）与隐藏维度（{}）都不能为0",
                self.input_size, self.hidden_size
            )));
        }
        let weights_shape = [4 * self.hidden_size, self.input_size + self.hidden_size];
        if self.weights.shape() != weights_shape {
            return Err(GraphError::ShapeMismatch {
                expected: weights_shape.to_vec(),
                got: self.weights.shape().to_vec(),
                message: "LSTM层权重的形状不符".to_string(),
            });
        }
        if self.biases.shape() != [4 * self.hidden_size] {
            return Err(GraphError::ShapeMismatch {
                expected: vec![4 * self.hidden_size],
                got: self.biases.shape().to_vec(),
                message: "LSTM层偏置的形状不符".to_string(),
            });
        }
        if self.input_layout.active_size() != self.input_size {
            return Err(GraphError::DimensionMismatch {
                expected: self.input_size,
                got: self.input_layout.active_size(),
                message: "输入布局的有效区大小须等于输入维度".to_string(),
            });
        }
        if self.output_layout.active_size() != self.hidden_size {
            return Err(GraphError::DimensionMismatch {
                expected: self.hidden_size,
                got: self.output_layout.active_size(),
                message: "输出布局的有效区大小须等于隐藏维度".to_string(),
            });
        }
        Ok(())
    }

    pub const fn input_size(&self) -> usize {
        self.input_size
    }

    pub const fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub const fn weights(&self) -> &Tensor {
        &self.weights
    }

    pub const fn biases(&self) -> &Tensor {
        &self.biases
    }

    pub const fn activation(&self) -> Activation {
        self.activation
    }

    pub const fn recurrent_activation(&self) -> Activation {
        self.recurrent_activation
    }

    pub const fn input_layout(&self) -> &MemoryLayout {
        &self.input_layout
    }

    pub const fn output_layout(&self) -> &MemoryLayout {
        &self.output_layout
    }

    /// 某个门的权重，形状 [`hidden_size`, `input_size` + `hidden_size`]
    pub fn gate_weights(&self, gate: GateKind) -> Result<Tensor, GraphError> {
        Ok(self
            .weights
            .rows(gate.index() * self.hidden_size, self.hidden_size)?)
    }

    /// 某个门的偏置，形状 [`hidden_size`]
    pub fn gate_bias(&self, gate: GateKind) -> Result<Tensor, GraphError> {
        Ok(self
            .biases
            .rows(gate.index() * self.hidden_size, self.hidden_size)?)
    }
}
