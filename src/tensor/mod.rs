use ndarray::{Array, IxDyn};
use rand::SeedableRng;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::errors::TensorError;

#[cfg(test)]
mod tests;

/// 定义张量的结构体。其可以是标量、向量、矩阵或更高维度的数组。
/// 本crate中张量只用来承载节点的值和常量数据（权重、偏置），
/// 数据始终按行主序（标准布局）连续存放，因此总能以平坦切片的形式访问。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    data: Array<f32, IxDyn>,
}

impl Tensor {
    /// 创建一个张量，`data`的长度必须和`shape`中所有元素的乘积相等，否则返回错误。
    pub fn try_new(data: &[f32], shape: &[usize]) -> Result<Tensor, TensorError> {
        let expected = shape.iter().product::<usize>();
        if data.len() != expected {
            return Err(TensorError::ShapeDataMismatch {
                shape: shape.to_vec(),
                data_len: data.len(),
                expected,
            });
        }
        Array::from_shape_vec(IxDyn(shape), data.to_vec())
            .map(|data| Tensor { data })
            .map_err(|_| TensorError::ShapeDataMismatch {
                shape: shape.to_vec(),
                data_len: data.len(),
                expected,
            })
    }

    /// 创建一个张量；若`data`长度与`shape`不符则panic。
    /// 适用于数据与形状都由调用方写死的场合（如测试、常量表）。
    pub fn new(data: &[f32], shape: &[usize]) -> Tensor {
        match Self::try_new(data, shape) {
            Ok(tensor) => tensor,
            Err(e) => panic!("{}", e),
        }
    }

    /// 创建一个全零张量
    pub fn zeros(shape: &[usize]) -> Tensor {
        Tensor {
            data: Array::zeros(IxDyn(shape)),
        }
    }

    /// 用固定种子创建一个均匀分布的随机张量，其值在[min, max]的闭区间
    pub fn new_uniform_seeded(min: f32, max: f32, shape: &[usize], seed: u64) -> Tensor {
        let mut rng = StdRng::seed_from_u64(seed);
        let uniform = Uniform::from(min..=max);
        let data = (0..shape.iter().product::<usize>())
            .map(|_| uniform.sample(&mut rng))
            .collect::<Vec<_>>();
        Tensor::new(&data, shape)
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// 元素总个数
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 以行主序的平坦切片访问全部数据
    pub fn data_as_slice(&self) -> &[f32] {
        self.data.as_slice().unwrap_or_default()
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.data_as_slice().to_vec()
    }

    /// 取第0维上`[start, start + count)`区间的“行”，组成一个新张量。
    /// 对向量而言“行”就是单个元素；对矩阵而言就是整行。
    pub fn rows(&self, start: usize, count: usize) -> Result<Tensor, TensorError> {
        let shape = self.shape();
        if shape.is_empty() {
            return Err(TensorError::ScalarHasNoRows);
        }
        let end = start + count;
        if end > shape[0] {
            return Err(TensorError::RowRangeOutOfBounds {
                start,
                end,
                rows: shape[0],
            });
        }
        let row_len = shape[1..].iter().product::<usize>();
        let mut new_shape = shape.to_vec();
        new_shape[0] = count;
        Self::try_new(
            &self.data_as_slice()[start * row_len..end * row_len],
            &new_shape,
        )
    }
}
