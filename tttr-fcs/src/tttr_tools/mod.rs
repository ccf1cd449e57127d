pub mod correlation;
pub mod microtime;
pub mod selection;
pub mod timetrace;
