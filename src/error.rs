/// Errors surfaced by a crop session.
///
/// Geometry edge cases (zero-delta drags, out-of-bounds pointers, tiny
/// selections) are recovered inside the selection state machine and never
/// show up here.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CropError {
    /// The asset could not be interpreted as an image.
    #[error("decode error: {0}")]
    Decode(String),

    /// The crop/encode pass could not produce output.
    #[error("render error: {0}")]
    Render(String),

    /// The asset was rejected by pre-flight validation.
    #[error("{0}")]
    InvalidAsset(String),

    #[error("invalid session state: {0}")]
    InvalidState(String),
}

impl CropError {
    /// Message suitable for showing to the person cropping the image.
    pub fn user_message(&self) -> String {
        match self {
            Self::Decode(_) => "Unable to open image for cropping.".to_string(),
            Self::Render(_) => "Unable to crop image. Please try again.".to_string(),
            Self::InvalidAsset(message) => message.clone(),
            Self::InvalidState(message) => message.clone(),
        }
    }
}
