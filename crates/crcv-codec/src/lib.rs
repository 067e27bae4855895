#![warn(clippy::pedantic)]

pub mod checksum;
pub mod encoded;
pub mod error;
pub mod strategy;
pub mod varint;

pub use checksum::{checksum, checksum_and_encode};
pub use encoded::{EncodedForm, encode};
pub use error::CodecError;
pub use strategy::EncodingStrategy;
