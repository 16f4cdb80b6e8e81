use crate::compiler::kernels;

/// 跨调用保留的循环状态：上一步的隐藏状态h与细胞状态c
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CellState {
    hidden: Vec<f32>,
    cell: Vec<f32>,
}

impl CellState {
    pub(crate) fn zeros(hidden_size: usize) -> Self {
        Self {
            hidden: vec![0.0; hidden_size],
            cell: vec![0.0; hidden_size],
        }
    }

    pub(crate) fn hidden(&self) -> &[f32] {
        &self.hidden
    }

    pub(crate) fn cell(&self) -> &[f32] {
        &self.cell
    }

    pub(crate) fn clear(&mut self) {
        self.hidden.fill(0.0);
        self.cell.fill(0.0);
    }

    pub(crate) fn commit(&mut self, new_hidden: &[f32], new_cell: &[f32]) {
        self.hidden.copy_from_slice(new_hidden);
        self.cell.copy_from_slice(new_cell);
    }
}

/// 重置信号的下降沿检测器，初始的“上一次”信号为0
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub(crate) struct ResetEdge {
    last: f32,
}

impl ResetEdge {
    /// 记录本次信号，返回是否出现下降沿
    pub(crate) fn observe(&mut self, current: f32) -> bool {
        let falling = kernels::is_falling_edge(self.last, current);
        self.last = current;
        falling
    }

    pub(crate) fn clear(&mut self) {
        self.last = 0.0;
    }
}

/// 直接求值时复用的临时缓冲区，构造节点时一次性分配
#[derive(Debug, Clone)]
pub(crate) struct StepScratch {
    pub(crate) input: Vec<f32>,
    pub(crate) gates: [Vec<f32>; 4],
    pub(crate) new_cell: Vec<f32>,
    pub(crate) activated_cell: Vec<f32>,
    pub(crate) new_hidden: Vec<f32>,
}

impl StepScratch {
    pub(crate) fn new(input_size: usize, hidden_size: usize) -> Self {
        Self {
            input: vec![0.0; input_size],
            gates: std::array::from_fn(|_| vec![0.0; hidden_size]),
            new_cell: vec![0.0; hidden_size],
            activated_cell: vec![0.0; hidden_size],
            new_hidden: vec![0.0; hidden_size],
        }
    }
}
