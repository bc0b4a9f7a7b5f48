use thiserror::Error;

use crate::types::ViewportSize;

/// Failures raised while evaluating the render tree.
///
/// None of these are fatal to the frame loop; the window logs them and
/// retries on the next tick.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("viewport {0} has no area")]
    EmptyViewport(ViewportSize),
}
