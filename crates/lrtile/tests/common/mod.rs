//! Shared helpers for the lrtile integration tests.
#![allow(dead_code)]

use lrtile::DenseBlock;
use num_complex::Complex64;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Install a test-writer subscriber once; `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn random_matrix(m: usize, n: usize, rng: &mut ChaCha8Rng) -> DenseBlock<f64> {
    DenseBlock::from_fn(&[m, n], |_| rng.random_range(-1.0..1.0))
}

pub fn random_complex_matrix(m: usize, n: usize, rng: &mut ChaCha8Rng) -> DenseBlock<Complex64> {
    DenseBlock::from_fn(&[m, n], |_| {
        Complex64::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0))
    })
}

/// `X · Y` with random `X` (m × r) and `Y` (r × n).
pub fn random_low_rank(m: usize, n: usize, r: usize, seed: u64) -> DenseBlock<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let x = random_matrix(m, r, &mut rng);
    let y = random_matrix(r, n, &mut rng);
    x.matmul(&y).unwrap()
}

/// Independent random factors `X` (m × r) and `Y` (r × n).
pub fn random_factors(m: usize, n: usize, r: usize, seed: u64) -> (DenseBlock<f64>, DenseBlock<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let x = random_matrix(m, r, &mut rng);
    let y = random_matrix(r, n, &mut rng);
    (x, y)
}

pub fn random_complex_low_rank(m: usize, n: usize, r: usize, seed: u64) -> DenseBlock<Complex64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let x = random_complex_matrix(m, r, &mut rng);
    let y = random_complex_matrix(r, n, &mut rng);
    x.matmul(&y).unwrap()
}

/// Symmetric positive semi-definite `X · Xᵀ` of rank `r`.
pub fn random_psd(n: usize, r: usize, seed: u64) -> DenseBlock<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let x = random_matrix(n, r, &mut rng);
    x.matmul(&x.adjoint()).unwrap()
}

/// `Q_1 · diag(s) · Q_2ᵀ` with orthonormal random `Q_1`, `Q_2`.
pub fn with_spectrum(n: usize, spectrum: &[f64], seed: u64) -> DenseBlock<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let k = spectrum.len();
    let q1 = lrtile_backend::thin_qr(random_matrix(n, k, &mut rng).as_slice(), n, k).unwrap();
    let q2 = lrtile_backend::thin_qr(random_matrix(n, k, &mut rng).as_slice(), n, k).unwrap();
    let mut left = DenseBlock::from_matrix(n, k, q1.q).unwrap();
    for i in 0..n {
        for j in 0..k {
            left[[i, j]] *= spectrum[j];
        }
    }
    let right = DenseBlock::from_matrix(n, k, q2.q).unwrap().adjoint();
    left.matmul(&right).unwrap()
}

pub fn scaled(block: &DenseBlock<f64>, factor: f64) -> DenseBlock<f64> {
    let mut out = block.clone();
    out.scale_to(factor);
    out
}

pub fn sum(a: &DenseBlock<f64>, b: &DenseBlock<f64>, factor: f64) -> DenseBlock<f64> {
    let mut out = a.clone();
    out.add_scaled_to(b, factor).unwrap();
    out
}
