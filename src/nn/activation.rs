/*
 * @Description  : 激活函数库
 *
 * 除 Softmax 外都是逐元素（pointwise）的；Softmax 对整个向量做归一化，
 * 用作门输出的归一化手段（见 DESIGN.md 中的开放问题2）。
 * 解释执行与编译执行都直接调用`apply`，保证两条路径逐位一致。
 */

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

#[enum_dispatch]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Activation {
    Sigmoid,
    Tanh,
    HardSigmoid,
    HardTanh,
    ReLU,
    LeakyReLU,
    Softmax,
}

#[enum_dispatch(Activation)]
pub trait TraitActivation {
    fn name(&self) -> &'static str;

    /// 原地对`data`施加激活函数
    fn apply(&self, data: &mut [f32]);

    /// 返回施加激活函数后的新向量
    fn apply_to(&self, data: &[f32]) -> Vec<f32> {
        let mut out = data.to_vec();
        self.apply(&mut out);
        out
    }

    /// 是否为逐元素激活
    fn is_pointwise(&self) -> bool {
        true
    }
}

impl Activation {
    pub const fn sigmoid() -> Self {
        Self::Sigmoid(Sigmoid)
    }

    pub const fn tanh() -> Self {
        Self::Tanh(Tanh)
    }

    pub const fn hard_sigmoid() -> Self {
        Self::HardSigmoid(HardSigmoid)
    }

    pub const fn hard_tanh() -> Self {
        Self::HardTanh(HardTanh)
    }

    pub const fn relu() -> Self {
        Self::ReLU(ReLU)
    }

    pub const fn leaky_relu(alpha: f32) -> Self {
        Self::LeakyReLU(LeakyReLU { alpha })
    }

    pub const fn softmax() -> Self {
        Self::Softmax(Softmax)
    }
}

/// sigmoid(x) = 1 / (1 + e^(-x))
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sigmoid;

impl TraitActivation for Sigmoid {
    fn name(&self) -> &'static str {
        "sigmoid"
    }

    fn apply(&self, data: &mut [f32]) {
        for x in data.iter_mut() {
            *x = 1.0 / (1.0 + (-*x).exp());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tanh;

impl TraitActivation for Tanh {
    fn name(&self) -> &'static str {
        "tanh"
    }

    fn apply(&self, data: &mut [f32]) {
        for x in data.iter_mut() {
            *x = x.tanh();
        }
    }
}

/// hard_sigmoid(x) = clamp(0.2x + 0.5, 0, 1)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HardSigmoid;

impl TraitActivation for HardSigmoid {
    fn name(&self) -> &'static str {
        "hard_sigmoid"
    }

    fn apply(&self, data: &mut [f32]) {
        for x in data.iter_mut() {
            *x = (0.2 * *x + 0.5).clamp(0.0, 1.0);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HardTanh;

impl TraitActivation for HardTanh {
    fn name(&self) -> &'static str {
        "hard_tanh"
    }

    fn apply(&self, data: &mut [f32]) {
        for x in data.iter_mut() {
            *x = x.clamp(-1.0, 1.0);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReLU;

impl TraitActivation for ReLU {
    fn name(&self) -> &'static str {
        "relu"
    }

    fn apply(&self, data: &mut [f32]) {
        for x in data.iter_mut() {
            *x = x.max(0.0);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeakyReLU {
    pub alpha: f32,
}

impl TraitActivation for LeakyReLU {
    fn name(&self) -> &'static str {
        "leaky_relu"
    }

    fn apply(&self, data: &mut [f32]) {
        for x in data.iter_mut() {
            if *x < 0.0 {
                *x *= self.alpha;
            }
        }
    }
}

/// softmax(x)_i = e^(x_i - max) / Σ e^(x_j - max)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Softmax;

impl TraitActivation for Softmax {
    fn name(&self) -> &'static str {
        "softmax"
    }

    fn apply(&self, data: &mut [f32]) {
        if data.is_empty() {
            return;
        }
        let max = data.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let mut sum = 0.0;
        for x in data.iter_mut() {
            *x = (*x - max).exp();
            sum += *x;
        }
        for x in data.iter_mut() {
            *x /= sum;
        }
    }

    fn is_pointwise(&self) -> bool {
        false
    }
}
