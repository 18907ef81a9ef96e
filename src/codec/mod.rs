//! Schema-driven encode/decode: the two halves that turn a
//! [`crate::value::Value`] into wire bytes and back, driven by a compiled
//! [`crate::schema::Schema`].

mod decoder;
mod encoder;

pub use decoder::decode;
pub use encoder::encode;
