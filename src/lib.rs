// Library surface for the binary, headless/integration tests and reuse.
pub mod app_dirs;
pub mod config;
pub mod engine;
pub mod error;
pub mod ground_truth;
pub mod history;
pub mod runtime;
pub mod scoring;
pub mod sequence;
pub mod session;
pub mod stimulus;
pub mod timer;

pub use engine::{GameEngine, Presenter};
pub use error::{EngineError, Result};
