//! Pixel-level processing of hit images: decoding and photometry
//! ([`frame_decoder`]) and the repair of crops blanked by overlapping hits
//! ([`reconstruction`]).
pub mod frame_decoder;
pub mod reconstruction;
