//! 数值内核。
//!
//! LSTM节点的直接求值与生成的指令都调用这里的函数，
//! 因此两条路径的浮点运算顺序完全相同，结果逐位一致。
//! 所有内核都只读写调用方给定的切片，不做堆分配。

/// `out = W · [first, second] + bias`，其中`W`按行主序存放，形状为`[out.len(), first.len() + second.len()]`
pub fn affine_concat(
    weights: &[f32],
    bias: &[f32],
    first: &[f32],
    second: &[f32],
    out: &mut [f32],
) {
    let cols = first.len() + second.len();
    if cols == 0 {
        out.copy_from_slice(&bias[..out.len()]);
        return;
    }
    for ((o, row), &b) in out.iter_mut().zip(weights.chunks_exact(cols)).zip(bias) {
        let (row_first, row_second) = row.split_at(first.len());
        *o = b + dot(row_first, first) + dot(row_second, second);
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// `out = a ⊙ b`
pub fn multiply(a: &[f32], b: &[f32], out: &mut [f32]) {
    for ((o, x), y) in out.iter_mut().zip(a).zip(b) {
        *o = x * y;
    }
}

/// `out = a ⊙ b + c ⊙ d`
pub fn multiply_add(a: &[f32], b: &[f32], c: &[f32], d: &[f32], out: &mut [f32]) {
    for ((((o, a), b), c), d) in out.iter_mut().zip(a).zip(b).zip(c).zip(d) {
        *o = a * b + c * d;
    }
}

/// `dst[i] = src[offsets[i]]`
pub fn gather(src: &[f32], offsets: &[usize], dst: &mut [f32]) {
    for (d, &offset) in dst.iter_mut().zip(offsets) {
        *d = src.get(offset).copied().unwrap_or_default();
    }
}

/// `dst[offsets[i]] = src[i]`
pub fn scatter(src: &[f32], offsets: &[usize], dst: &mut [f32]) {
    for (&s, &offset) in src.iter().zip(offsets) {
        if let Some(d) = dst.get_mut(offset) {
            *d = s;
        }
    }
}

/// 重置信号是否出现下降沿（由非零变为零）
pub fn is_falling_edge(previous: f32, current: f32) -> bool {
    previous != 0.0 && current == 0.0
}
