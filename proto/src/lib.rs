pub mod collection;
pub mod context;
pub mod error;
pub mod event;
pub mod op;
pub mod request;

pub use collection::*;
pub use context::*;
pub use error::*;
pub use event::*;
pub use op::*;
pub use request::*;
