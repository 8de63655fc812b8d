use std::f32::consts::PI;

/// Unnormalised 1-D DCT-II of `input` into `output`.
pub fn dct2(input: &[f32], output: &mut [f32]) {
    let n = input.len();
    debug_assert_eq!(n, output.len());
    let pi_over_n = PI / n as f32;

    for (k, out) in output.iter_mut().enumerate() {
        *out = input
            .iter()
            .enumerate()
            .map(|(i, x)| x * (pi_over_n * (i as f32 + 0.5) * k as f32).cos())
            .sum();
    }
}

/// Separable 2-D DCT-II of a row-major `size` x `size` matrix.
///
/// Rows first, then columns. Panics if `data` does not hold `size * size` values.
pub fn dct2_2d(data: &[f32], size: usize) -> Vec<f32> {
    assert_eq!(data.len(), size * size, "dct2_2d needs a square matrix");

    let mut rows = vec![0.0; size * size];
    for (src, dst) in data.chunks_exact(size).zip(rows.chunks_exact_mut(size)) {
        dct2(src, dst);
    }

    let mut result = vec![0.0; size * size];
    let mut column = vec![0.0; size];
    let mut transformed = vec![0.0; size];
    for x in 0..size {
        for y in 0..size {
            column[y] = rows[y * size + x];
        }
        dct2(&column, &mut transformed);
        for y in 0..size {
            result[y * size + x] = transformed[y];
        }
    }
    result
}

pub fn mean(values: &[f32]) -> Option<f32> {
    match values.len() {
        0 => None,
        len => Some(values.iter().sum::<f32>() / len as f32),
    }
}
