pub mod emotion;
pub mod error;

pub use emotion::{Classification, Emotion, EmotionGuidance, NOT_A_CAT_SENTINEL};
pub use error::{Error, Result};
