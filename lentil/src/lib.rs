pub mod cli;
pub mod common_io;
pub mod inference;
pub mod sgvb;
pub mod toy_data;

pub use candle_core;
pub use candle_nn;
