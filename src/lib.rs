pub mod audio;
pub mod chart;
pub mod config;
pub mod dispatch;
pub mod feedback;
mod logging;
pub mod session;
mod telemetry;

pub use logging::{init_logging, log_debug, log_debug_content, log_file_path};
pub use session::{SessionController, SessionEvent, SessionPhase};
pub use telemetry::init_tracing;
