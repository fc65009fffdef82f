//! Audio subsystem module

pub mod analyzer;
pub mod capture;
pub mod device;
pub mod filter;
pub mod frame;
pub mod output;

pub use analyzer::FrequencyAnalyzer;
pub use capture::{CaptureCommand, CaptureSession};
pub use device::{get_output_device, list_output_devices};
pub use frame::{AudioFrame, DecodedBuffer};
pub use output::AudioOutput;
