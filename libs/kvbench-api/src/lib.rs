mod clock;
mod error;
mod kv;
mod record;

pub use clock::now_ns;
pub use error::WireError;
pub use kv::{MemoryKv, NOT_FOUND};
pub use record::{Layout, Op, Record};
