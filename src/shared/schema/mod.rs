pub mod appraisal;
pub mod calendar;
pub mod core;
pub mod timeoff;

pub use self::appraisal::*;
pub use self::calendar::*;
pub use self::core::*;
pub use self::timeoff::*;
