//! Client-side playback: jitter buffering, timed scheduling and visualization

pub mod buffer;
pub mod player;
pub mod scheduler;
pub mod visualizer;

pub use buffer::{FrameAssembler, PlaybackQueue};
pub use player::{Player, PlayerState};
pub use scheduler::{AudioEngine, PlaybackScheduler, SchedulerStats};
pub use visualizer::{VisualFrame, Visualizer};
