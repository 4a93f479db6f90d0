pub mod app;
pub mod block;
pub mod buffer;
pub mod cli;
pub mod command;
pub mod core;
pub mod device;
pub mod error;
pub mod flush;
pub mod layout;
pub mod lock;
pub mod merge;
pub mod output;
pub mod ssd;

pub use block::*;
pub use buffer::{BufferStore, MemoryBuffer, PendingOp};
pub use cli::*;
pub use command::*;
pub use self::core::SsdCore;
pub use device::*;
pub use error::*;
pub use output::*;
pub use ssd::*;
