/*
 * @Author       : 老董
 * @Date         : 2026-10-05
 * @Description  : 端口内存布局：描述一块平坦缓冲区中多维数据的形状、四周填充与维度存放顺序
 *
 * 术语：
 *   - 逻辑维度：数据本身的维度，如[rows, cols, channels]，编号0..n
 *   - 维度顺序：逻辑维度在内存中由外到内的排列，如[0, 1, 2]即行主序
 *   - 有效区：去掉填充后的数据区，其元素个数即`active_size`
 */

use serde::{Deserialize, Serialize};

use crate::nn::GraphError;

/// 逻辑维度在内存中由外到内的排列顺序，必须是0..n的一个排列。
/// 反序列化时同样经`DimensionOrder::new`校验
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct DimensionOrder(Vec<usize>);

impl TryFrom<Vec<usize>> for DimensionOrder {
    type Error = GraphError;

    fn try_from(order: Vec<usize>) -> Result<Self, Self::Error> {
        Self::new(&order)
    }
}

impl From<DimensionOrder> for Vec<usize> {
    fn from(order: DimensionOrder) -> Self {
        order.0
    }
}

impl DimensionOrder {
    pub fn new(order: &[usize]) -> Result<Self, GraphError> {
        let mut seen = vec![false; order.len()];
        for &dim in order {
            if dim >= order.len() || seen[dim] {
                return Err(GraphError::InvalidOperation(format!(
                    "维度顺序{:?}不是0..{}的一个排列",
                    order,
                    order.len()
                )));
            }
            seen[dim] = true;
        }
        Ok(Self(order.to_vec()))
    }

    /// 行主序：[0, 1, ..., n-1]
    pub fn canonical(num_dimensions: usize) -> Self {
        Self((0..num_dimensions).collect())
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn num_dimensions(&self) -> usize {
        self.0.len()
    }

    pub fn is_canonical(&self) -> bool {
        self.0.iter().enumerate().all(|(i, &d)| i == d)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMemoryLayout")]
pub struct MemoryLayout {
    /// 各逻辑维度的有效长度
    shape: Vec<usize>,
    /// 各逻辑维度两侧的填充长度（两侧对称）
    padding: Vec<usize>,
    order: DimensionOrder,
}

/// 存档中的布局字段，须经`MemoryLayout::new`校验后才能使用
#[derive(Deserialize)]
struct RawMemoryLayout {
    shape: Vec<usize>,
    padding: Vec<usize>,
    order: DimensionOrder,
}

impl TryFrom<RawMemoryLayout> for MemoryLayout {
    type Error = GraphError;

    fn try_from(raw: RawMemoryLayout) -> Result<Self, Self::Error> {
        Self::new(&raw.shape, &raw.padding, raw.order)
    }
}

impl MemoryLayout {
    pub fn new(
        shape: &[usize],
        padding: &[usize],
        order: DimensionOrder,
    ) -> Result<Self, GraphError> {
        if shape.is_empty() {
            return Err(GraphError::InvalidOperation(
                "内存布局至少需要1个维度".to_string(),
            ));
        }
        if padding.len() != shape.len() {
            return Err(GraphError::DimensionMismatch {
                expected: shape.len(),
                got: padding.len(),
                message: "填充的维数须与形状的维数一致".to_string(),
            });
        }
        if order.num_dimensions() != shape.len() {
            return Err(GraphError::DimensionMismatch {
                expected: shape.len(),
                got: order.num_dimensions(),
                message: "维度顺序的维数须与形状的维数一致".to_string(),
            });
        }
        Ok(Self {
            shape: shape.to_vec(),
            padding: padding.to_vec(),
            order,
        })
    }

    /// 无填充、行主序的布局
    pub fn from_shape(shape: &[usize]) -> Result<Self, GraphError> {
        Self::new(
            shape,
            &vec![0; shape.len()],
            DimensionOrder::canonical(shape.len()),
        )
    }

    /// 长度为`len`的一维向量布局
    pub fn vector(len: usize) -> Self {
        Self {
            shape: vec![len],
            padding: vec![0],
            order: DimensionOrder::canonical(1),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn padding(&self) -> &[usize] {
        &self.padding
    }

    pub fn num_dimensions(&self) -> usize {
        self.shape.len()
    }

    /// 逻辑维度顺序，供`can_accept_input_layout`协商布局
    pub fn logical_dimension_order(&self) -> &DimensionOrder {
        &self.order
    }

    /// 含填充后各逻辑维度的长度
    pub fn extent(&self) -> Vec<usize> {
        self.shape
            .iter()
            .zip(&self.padding)
            .map(|(&s, &p)| s + 2 * p)
            .collect()
    }

    /// 有效区元素个数
    pub fn active_size(&self) -> usize {
        self.shape.iter().product()
    }

    /// 整块缓冲区（含填充）的元素个数
    pub fn memory_size(&self) -> usize {
        self.extent().iter().product()
    }

    /// 逻辑下标（不含填充）在平坦缓冲区中的偏移
    pub fn physical_offset(&self, logical_index: &[usize]) -> usize {
        let extent = self.extent();
        self.order.as_slice().iter().fold(0, |offset, &dim| {
            offset * extent[dim] + logical_index[dim] + self.padding[dim]
        })
    }

    /// 按逻辑行主序枚举有效区每个元素在平坦缓冲区中的偏移
    pub fn active_offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::with_capacity(self.active_size());
        if self.active_size() == 0 {
            return offsets;
        }
        let mut index = vec![0; self.shape.len()];
        loop {
            offsets.push(self.physical_offset(&index));
            // 最后一维最先进位
            let mut dim = self.shape.len();
            loop {
                if dim == 0 {
                    return offsets;
                }
                dim -= 1;
                index[dim] += 1;
                if index[dim] < self.shape[dim] {
                    break;
                }
                index[dim] = 0;
            }
        }
    }
}
