use crate::errors::TensorError;
use crate::tensor::Tensor;

#[test]
fn test_new_and_shape() {
    let tensor = Tensor::new(&[1., 2., 3., 4., 5., 6.], &[2, 3]);
    assert_eq!(tensor.shape(), &[2, 3]);
    assert_eq!(tensor.size(), 6);
    assert_eq!(tensor.data_as_slice(), &[1., 2., 3., 4., 5., 6.]);
}

#[test]
fn test_try_new_with_wrong_data_len() {
    let result = Tensor::try_new(&[1., 2., 3.], &[2, 2]);
    assert_eq!(
        result,
        Err(TensorError::ShapeDataMismatch {
            shape: vec![2, 2],
            data_len: 3,
            expected: 4,
        })
    );
}

#[test]
#[should_panic(expected = "数据长度3与形状[2, 2]所需的元素个数4不一致")]
fn test_new_panics_with_wrong_data_len() {
    let _ = Tensor::new(&[1., 2., 3.], &[2, 2]);
}

#[test]
fn test_zeros() {
    let tensor = Tensor::zeros(&[3]);
    assert_eq!(tensor.data_as_slice(), &[0., 0., 0.]);
}

#[test]
fn test_rows_of_matrix() {
    let tensor = Tensor::new(&[1., 2., 3., 4., 5., 6., 7., 8.], &[4, 2]);
    let rows = tensor.rows(1, 2).unwrap();
    assert_eq!(rows.shape(), &[2, 2]);
    assert_eq!(rows.data_as_slice(), &[3., 4., 5., 6.]);
}

#[test]
fn test_rows_of_vector() {
    let tensor = Tensor::new(&[1., 2., 3., 4.], &[4]);
    let rows = tensor.rows(2, 2).unwrap();
    assert_eq!(rows.shape(), &[2]);
    assert_eq!(rows.data_as_slice(), &[3., 4.]);
}

#[test]
fn test_rows_out_of_bounds() {
    let tensor = Tensor::new(&[1., 2., 3., 4.], &[4]);
    assert_eq!(
        tensor.rows(3, 2),
        Err(TensorError::RowRangeOutOfBounds {
            start: 3,
            end: 5,
            rows: 4
        })
    );
}

#[test]
fn test_uniform_seeded_is_reproducible() {
    let a = Tensor::new_uniform_seeded(-1.0, 1.0, &[3, 4], 42);
    let b = Tensor::new_uniform_seeded(-1.0, 1.0, &[3, 4], 42);
    assert_eq!(a, b);
    assert!(a.data_as_slice().iter().all(|x| (-1.0..=1.0).contains(x)));
}
