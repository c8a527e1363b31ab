pub mod context;
pub mod errors;
pub mod math;

pub use context::CallContext;
pub use errors::{DexError, ErrorKind, Side};
