// Dropout policy shared by the node primitives
//
// Nodes accept an optional dropout probability at init time and apply it to
// their output only while the graph handle is in training mode. Inverted
// scaling (1/(1-p) on kept elements) preserves the expected value, so
// evaluation mode needs no compensation.

use rand::Rng;
use stancer_core::error::{Error, Result};
use stancer_core::tensor::Tensor;

/// Validate a dropout policy at node-init time.
///
/// `None` and `Some(0.0)` both mean "disabled"; probabilities outside
/// [0, 1) are a configuration error.
pub fn validate_policy(policy: Option<f64>) -> Result<Option<f64>> {
    match policy {
        None => Ok(None),
        Some(p) if (0.0..1.0).contains(&p) => Ok(if p == 0.0 { None } else { Some(p) }),
        Some(p) => Err(Error::InvalidDropout { got: p }),
    }
}

/// Apply inverted dropout: zero each element with probability `p`, scale
/// survivors by `1/(1-p)`.
pub fn inverted_dropout<R: Rng>(x: &Tensor, p: f64, rng: &mut R) -> Result<Tensor> {
    let scale = (1.0 / (1.0 - p)) as f32;
    let data = x
        .data()
        .iter()
        .map(|v| if rng.gen_range(0.0..1.0) < p { 0.0 } else { v * scale })
        .collect();
    Tensor::from_vec(data, x.dims().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn policy_validation() {
        assert!(validate_policy(None).unwrap().is_none());
        assert!(validate_policy(Some(0.0)).unwrap().is_none());
        assert_eq!(validate_policy(Some(0.5)).unwrap(), Some(0.5));
        assert!(validate_policy(Some(1.0)).is_err());
        assert!(validate_policy(Some(-0.1)).is_err());
    }

    #[test]
    fn dropout_zeroes_or_scales() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(3);
        let x = Tensor::full([64], 1.0)?;
        let y = inverted_dropout(&x, 0.5, &mut rng)?;
        assert!(y.data().iter().all(|v| *v == 0.0 || (*v - 2.0).abs() < 1e-6));
        assert!(y.data().iter().any(|v| *v == 0.0));
        assert!(y.data().iter().any(|v| *v != 0.0));
        Ok(())
    }
}
