pub mod logs;
pub mod reader;
pub mod throughput;

pub use logs::{LogQuery, LogWindow};
pub use reader::{RawRecord, ReadMode, StreamReader, StreamTotals};
pub use throughput::aggregate;
