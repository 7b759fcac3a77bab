//! Shader contract
//!
//! A shader transforms a frame in place just before it is encoded. The bus
//! decides whether the shader sees a private copy or the live buffer.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// In-place frame transform
pub trait Shader<C> {
    /// Transform `colors` in place
    fn apply(&mut self, colors: &mut [C]);
}

/// Identity shader
#[derive(Debug, Clone, Copy, Default)]
pub struct NoShader;

impl<C> Shader<C> for NoShader {
    fn apply(&mut self, _colors: &mut [C]) {}
}

impl<C, F: FnMut(&mut [C])> Shader<C> for F {
    fn apply(&mut self, colors: &mut [C]) {
        self(colors);
    }
}

/// Two shaders applied in order
impl<C, A: Shader<C>, B: Shader<C>> Shader<C> for (A, B) {
    fn apply(&mut self, colors: &mut [C]) {
        self.0.apply(colors);
        self.1.apply(colors);
    }
}

/// Which buffer the shader chain runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ShaderMode {
    /// Shade a private copy; stored pixels read back unchanged
    #[default]
    Copy,
    /// Shade the live buffer; saves the copy, stored pixels change
    InPlace,
}
