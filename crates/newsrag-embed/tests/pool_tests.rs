use candle_core::{DType, Device, Tensor};
use newsrag_embed::masked_mean_l2;

#[test]
fn masked_mean_l2_ignores_padding_per_row() {
    let dev = Device::Cpu;
    // Batch of two sequences, three tokens, hidden dim 2.
    let h = Tensor::from_slice(
        &[
            3.0f32, 4.0, // row 0, token 0
            6.0, 8.0, // row 0, token 1
            100.0, 100.0, // row 0, token 2 (padding)
            0.0, 2.0, // row 1, token 0
            -9.0, 9.0, // row 1, token 1 (padding)
            -9.0, 9.0, // row 1, token 2 (padding)
        ],
        (2, 3, 2),
        &dev,
    )
    .unwrap();
    let mask = Tensor::from_slice(&[1u32, 1, 0, 1, 0, 0], (2, 3), &dev).unwrap().to_dtype(DType::F32).unwrap();
    let out: Vec<Vec<f32>> = masked_mean_l2(&h, &mask).unwrap().to_vec2().unwrap();

    // Row 0 mean is [4.5, 6] -> [0.6, 0.8]; row 1 mean is [0, 2] -> [0, 1].
    let expected = [[0.6f32, 0.8], [0.0, 1.0]];
    for (row, want) in out.iter().zip(expected) {
        for (a, b) in row.iter().zip(want) {
            assert!((a - b).abs() < 1e-5, "a={a} b={b}");
        }
    }
}

#[test]
fn masked_mean_l2_rejects_wrong_rank() {
    let dev = Device::Cpu;
    let h = Tensor::zeros((2, 4), DType::F32, &dev).unwrap();
    let mask = Tensor::ones((2, 4), DType::F32, &dev).unwrap();
    assert!(masked_mean_l2(&h, &mask).is_err());
}
