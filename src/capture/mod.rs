pub mod commands;
pub mod error;
pub mod gate;
pub mod pipeline;
pub mod rect;
pub mod screen;
pub mod selector;
pub mod window;

pub use error::{CaptureError, CaptureResult};
pub use gate::CaptureGate;
pub use pipeline::{CapturePipeline, SettlePolicy};
pub use rect::{PixelRect, SelectionRect};
pub use screen::{PrimaryMonitor, ScreenSource};
pub use selector::SelectionBroker;
pub use window::{HostWindow, TauriHostWindow, WindowBounds};
