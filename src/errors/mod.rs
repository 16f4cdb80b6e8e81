use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TensorError {
    #[error("数据长度{data_len}与形状{shape:?}所需的元素个数{expected}不一致")]
    ShapeDataMismatch {
        shape: Vec<usize>,
        data_len: usize,
        expected: usize,
    },
    #[error("无法对0维张量按行切片")]
    ScalarHasNoRows,
    #[error("行区间[{start}, {end})超出了张量的行数{rows}")]
    RowRangeOutOfBounds { start: usize, end: usize, rows: usize },
}
