pub mod api_router;
pub mod appraisal;
pub mod calendar;
pub mod config;
pub mod email;
pub mod file;
pub mod people;
pub mod shared;
pub mod timeoff;
