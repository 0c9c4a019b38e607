pub mod shutdown;
pub mod timestamp;

pub use shutdown::ShutdownFlag;
pub use timestamp::{now_ns, now_secs};
