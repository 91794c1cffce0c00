//! Progress Projector
//!
//! Turns boundary char offsets into the fraction drawn by the circular
//! progress indicator.

/// Direction the progress fraction is measured in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressConvention {
    /// 0 at the start, 1 when everything was spoken
    Elapsed,
    /// 1 at the start, 0 when everything was spoken
    Remaining,
}

/// Fractions reported by the controller are elapsed fractions.
/// Renderers drawing the remaining arc use [`ProgressProjector::remaining`].
pub const PROGRESS_CONVENTION: ProgressConvention = ProgressConvention::Elapsed;

/// Fraction shown before anything is spoken
pub const READY_FRACTION: f32 = 0.0;

/// Whether a text has more than one word
///
/// Single words get no incremental progress: engines do not report
/// boundaries reliably inside one short token.
pub fn is_multi_token(text: &str) -> bool {
    text.split_whitespace().nth(1).is_some()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressProjector {
    multi_token: bool,
    total_len: usize,
    fraction: f32,
}

impl Default for ProgressProjector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressProjector {
    pub fn new() -> Self {
        Self {
            multi_token: false,
            total_len: 0,
            fraction: READY_FRACTION,
        }
    }

    /// Get ready for a new text; returns the ready fraction
    pub fn prepare(&mut self, text: &str) -> f32 {
        self.multi_token = is_multi_token(text);
        self.total_len = text.chars().count();
        self.reset()
    }

    pub fn reset(&mut self) -> f32 {
        self.fraction = READY_FRACTION;
        self.fraction
    }

    /// Project a boundary at `char_index` of a `total_length` char text
    ///
    /// Never moves backwards while an utterance is live.
    pub fn project(&mut self, char_index: usize, total_length: usize) -> f32 {
        if !self.multi_token || total_length == 0 {
            return self.fraction;
        }
        let candidate = (char_index as f32 / total_length as f32).clamp(0.0, 1.0);
        self.fraction = self.fraction.max(candidate);
        self.fraction
    }

    /// Project a boundary of the prepared text
    pub fn advance(&mut self, char_index: usize) -> f32 {
        self.project(char_index, self.total_len)
    }

    /// The utterance ended; move to the terminal fraction
    pub fn finish(&mut self) -> f32 {
        self.fraction = self.terminal_fraction();
        self.fraction
    }

    /// Fraction shown once speech ended
    pub fn terminal_fraction(&self) -> f32 {
        if self.multi_token {
            1.0
        } else {
            READY_FRACTION
        }
    }

    pub fn fraction(&self) -> f32 {
        self.fraction
    }

    /// Unspoken share of the text, for arcs drawn the other way round
    pub fn remaining(&self) -> f32 {
        1.0 - self.fraction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convention_is_elapsed() {
        assert_eq!(PROGRESS_CONVENTION, ProgressConvention::Elapsed);
        assert_eq!(READY_FRACTION, 0.0);
    }

    #[test]
    fn test_multi_token_detection() {
        assert!(!is_multi_token("hola"));
        assert!(!is_multi_token("  hola  "));
        assert!(is_multi_token("buenos días"));
        assert!(!is_multi_token(""));
    }

    #[test]
    fn test_multi_token_projection_pins_elapsed_fraction() {
        let mut projector = ProgressProjector::new();
        projector.prepare("buenos días amigos");
        let fraction = projector.project(7, 19);
        assert!((fraction - 7.0 / 19.0).abs() < 1e-6);
        assert!((fraction - 0.368).abs() < 1e-3);
        assert!((projector.remaining() - 0.632).abs() < 1e-3);
    }

    #[test]
    fn test_single_token_only_ready_and_terminal() {
        let mut projector = ProgressProjector::new();
        let mut seen = vec![projector.prepare("hola")];
        for index in 0..4 {
            seen.push(projector.advance(index));
        }
        seen.push(projector.finish());
        assert!(seen
            .iter()
            .all(|f| *f == READY_FRACTION || *f == projector.terminal_fraction()));
    }

    #[test]
    fn test_fraction_never_decreases() {
        let mut projector = ProgressProjector::new();
        projector.prepare("uno dos tres cuatro");
        assert!(projector.advance(8) > 0.0);
        let high = projector.fraction();
        assert_eq!(projector.advance(4), high);
        assert_eq!(projector.advance(400), 1.0);
    }

    #[test]
    fn test_finish_and_reset() {
        let mut projector = ProgressProjector::new();
        projector.prepare("uno dos");
        projector.advance(4);
        assert_eq!(projector.finish(), 1.0);
        assert_eq!(projector.reset(), READY_FRACTION);
    }
}
