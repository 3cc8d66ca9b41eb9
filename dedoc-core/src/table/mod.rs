pub mod cell;
pub mod splitter;

pub use cell::{Cell, CellOverrides};
pub use splitter::{CellSplitter, SplitterConfig};
