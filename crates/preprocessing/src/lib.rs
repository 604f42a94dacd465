//! Data preparation between a loaded table and a predictor: min-max scaling,
//! supervised windowing, and chronological train/evaluation splitting.

pub mod scaler;
pub mod splitter;
pub mod windower;

pub use scaler::{MinMaxScaler, ScalerParams};
pub use splitter::ChronologicalSplit;
pub use windower::{latest_window, make_windows, pointwise, WindowSet};
