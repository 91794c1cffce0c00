//! Narration playback
//!
//! Session, progress projection, the controller state machine, and the
//! event loop that drives it.

pub mod driver;
pub mod machine;
pub mod projector;
pub mod session;

pub use driver::{run, UserCommand};
pub use machine::{
    NarrationOptions, PlaybackController, PlaybackEvent, PlaybackStatus, PlaybackVisualState,
    SETTLE_DELAY,
};
pub use projector::{ProgressConvention, ProgressProjector, PROGRESS_CONVENTION};
pub use session::{PlayOutcome, SessionState, UtteranceSession};
