pub mod encoders;
pub mod ptu;
pub mod records;
pub mod spc;
pub mod streamer;
