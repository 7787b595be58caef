pub mod backend;
pub mod cli;
pub mod config;
pub mod emission;
pub mod error;
pub mod focus;
pub mod focus_control;
pub mod gesture;
pub mod input;
pub mod replay;
pub mod scene;
pub mod session;
pub mod source;
pub mod time;
pub mod tool_wheel;
pub mod widgets;

pub use error::{SourceError, TeardownError};
pub use gesture::ToolCommand;
pub use session::{InteractionSession, SessionContext, SessionLayout};
