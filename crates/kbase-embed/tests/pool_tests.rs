use candle_core::{DType, Device, Tensor};
use kbase_embed::mean_pool_l2;

#[test]
fn mean_pool_ignores_masked_tokens() {
    let dev = Device::Cpu;
    // Two tokens with hidden dim 4; the second one is padding.
    let data = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
    let h = Tensor::from_slice(&data, (1, 2, 4), &dev).unwrap();
    let mask = Tensor::from_slice(&[1u32, 0u32], (1, 2), &dev).unwrap();

    let out: Vec<Vec<f32>> = mean_pool_l2(&h, &mask).unwrap().to_vec2().unwrap();

    let norm = 30.0f32.sqrt();
    let expected = [1.0 / norm, 2.0 / norm, 3.0 / norm, 4.0 / norm];
    for (a, b) in out[0].iter().zip(expected) {
        assert!((a - b).abs() < 1e-5, "a={a} b={b}");
    }
}

#[test]
fn mean_pool_averages_unmasked_tokens() {
    let dev = Device::Cpu;
    let h = Tensor::from_slice(&[2.0f32, 0.0, 0.0, 2.0], (1, 2, 2), &dev).unwrap();
    let mask =
        Tensor::from_slice(&[1i64, 1i64], (1, 2), &dev).unwrap().to_dtype(DType::F32).unwrap();

    let out: Vec<Vec<f32>> = mean_pool_l2(&h, &mask).unwrap().to_vec2().unwrap();

    let expected = 1.0 / 2.0f32.sqrt();
    assert!((out[0][0] - expected).abs() < 1e-5);
    assert!((out[0][1] - expected).abs() < 1e-5);
}
