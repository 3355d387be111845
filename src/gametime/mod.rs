pub mod convert;
pub mod extrapolate;
pub mod snapshot;

pub use convert::{to_hour_minute, HourMinute};
pub use extrapolate::{DisplayedTime, ExtrapolationMode, ExtrapolationState, Extrapolator};
pub use snapshot::{write_sample, RawTimeSample, StateFileReader, TimeSnapshot};
