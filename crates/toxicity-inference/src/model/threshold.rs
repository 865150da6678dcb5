/// Default classification threshold between 0.0 and 1.0.
///
/// If P(toxic) >= threshold, the text is classified as toxic. The comparison
/// is inclusive, so a score of exactly 0.5 is toxic.
pub const CLASSIFICATION_THRESHOLD: f32 = 0.5;
