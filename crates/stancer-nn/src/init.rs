// Parameter initialization utilities
//
// Standalone functions for creating initialized parameter tensors. All
// functions draw from a caller-supplied Rng, so model construction is
// reproducible from a seed.

use rand::Rng;
use stancer_core::error::{Error, Result};
use stancer_core::tensor::Tensor;

/// Compute (fan_in, fan_out) from dimensions.
///
/// - For 1-D: fan_in = fan_out = dims[0]
/// - For 2-D: fan_in = dims[1], fan_out = dims[0]
fn compute_fans(dims: &[usize]) -> Result<(f64, f64)> {
    match dims {
        [n] => Ok((*n as f64, *n as f64)),
        [out, inp] => Ok((*inp as f64, *out as f64)),
        _ => Err(Error::RankMismatch {
            expected: 2,
            got: dims.len(),
        }),
    }
}

/// Initialize a tensor from a uniform distribution U(low, high).
pub fn uniform<R: Rng>(dims: impl Into<Vec<usize>>, low: f64, high: f64, rng: &mut R) -> Result<Tensor> {
    let dims = dims.into();
    let count: usize = dims.iter().product();
    let data = (0..count).map(|_| rng.gen_range(low..high) as f32).collect();
    Tensor::from_vec(data, dims)
}

/// Initialize a tensor with Xavier (Glorot) uniform initialization:
/// U(-b, b) with b = sqrt(6 / (fan_in + fan_out)).
///
/// Keeps activation variance stable through tanh/sigmoid layers, which is
/// what every stage of this pipeline uses.
pub fn xavier_uniform<R: Rng>(dims: impl Into<Vec<usize>>, rng: &mut R) -> Result<Tensor> {
    let dims = dims.into();
    let (fan_in, fan_out) = compute_fans(&dims)?;
    let bound = (6.0 / (fan_in + fan_out)).sqrt();
    uniform(dims, -bound, bound, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn uniform_respects_bounds() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(7);
        let t = uniform([4, 8], -0.5, 0.5, &mut rng)?;
        assert_eq!(t.dims(), &[4, 8]);
        assert!(t.data().iter().all(|v| (-0.5..0.5).contains(&(*v as f64))));
        Ok(())
    }

    #[test]
    fn xavier_bound_shrinks_with_fan() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(7);
        let t = xavier_uniform([100, 100], &mut rng)?;
        let bound = (6.0f64 / 200.0).sqrt() as f32;
        assert!(t.data().iter().all(|v| v.abs() <= bound));
        Ok(())
    }

    #[test]
    fn seeded_init_is_reproducible() -> Result<()> {
        let a = uniform([3], -1.0, 1.0, &mut StdRng::seed_from_u64(42))?;
        let b = uniform([3], -1.0, 1.0, &mut StdRng::seed_from_u64(42))?;
        assert_eq!(a.data(), b.data());
        Ok(())
    }
}
