use crate::model::{ModelError, SequenceModel};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("cannot encode an empty token sequence")]
    EmptyInput,
    #[error("model exposed no layers beyond the input embedding")]
    MissingLayers,
    #[error("layer {layer} activation width {got} does not match hidden dimension {expected}")]
    LayerWidthMismatch {
        layer: usize,
        expected: usize,
        got: usize,
    },
}

/// Configuration for engram encoding.
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Token window passed to the forward pass; older tokens are dropped.
    pub max_tokens: usize,
    /// Additive term of the global affine normalization.
    pub shift: f64,
    /// Divisor of the global affine normalization.
    pub factor: f64,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            shift: 10_000.0,
            factor: 20_000.0,
        }
    }
}

/// Compresses a forward pass into one fixed-length engram vector.
///
/// Each retained layer (everything after the input embedding) is averaged
/// over the token axis, then the per-layer vectors are summed with weight
/// `i / L` for the i-th retained layer, so later layers contribute
/// proportionally more. The sum is carried in `f64` and only the final
/// normalized vector is narrowed back to `f32`.
///
/// The shift/factor normalization is global on purpose: every engram in a
/// chain must share one scale or their distances stop being comparable.
pub struct EngramEncoder<M> {
    model: M,
    config: EncoderConfig,
}

impl<M: SequenceModel> EngramEncoder<M> {
    pub fn new(model: M, config: EncoderConfig) -> Self {
        Self { model, config }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Encodes a token sequence into an engram of length `hidden_dim()`.
    pub fn encode(&self, tokens: &[u32]) -> Result<Vec<f32>, EncodeError> {
        if tokens.is_empty() {
            return Err(EncodeError::EmptyInput);
        }
        let start = tokens.len().saturating_sub(self.config.max_tokens);
        let window = &tokens[start..];

        let layers = self.model.forward(window)?;
        // Layer 0 is the input embedding and never contributes.
        if layers.len() < 2 {
            return Err(EncodeError::MissingLayers);
        }
        let retained = &layers[1..];
        let hidden = self.model.hidden_dim();

        let mut sum = vec![0.0f64; hidden];
        let layer_weight = 1.0 / retained.len() as f64;
        let mut weight = 0.0;
        for (offset, layer) in retained.iter().enumerate() {
            if layer.hidden() != hidden {
                return Err(EncodeError::LayerWidthMismatch {
                    layer: offset + 1,
                    expected: hidden,
                    got: layer.hidden(),
                });
            }
            if layer.tokens() == 0 {
                return Err(EncodeError::EmptyInput);
            }
            weight += layer_weight;

            let token_count = layer.tokens() as f64;
            let mut mean = vec![0.0f64; hidden];
            for row in layer.rows() {
                for (acc, &value) in mean.iter_mut().zip(row) {
                    *acc += value as f64;
                }
            }
            for (acc, m) in sum.iter_mut().zip(&mean) {
                *acc += (m / token_count) * weight;
            }
        }

        let engram: Vec<f32> = sum
            .iter()
            .map(|&v| ((v + self.config.shift) / self.config.factor) as f32)
            .collect();
        debug!(
            tokens = window.len(),
            layers = retained.len(),
            dim = engram.len(),
            "encoded engram"
        );
        Ok(engram)
    }
}
