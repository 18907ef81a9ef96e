//! A schema-driven Protocol Buffers wire-format codec.
//!
//! Encodes and decodes protobuf binary messages against a compact,
//! user-supplied schema -- no `.proto` files, no generated code. Two schema
//! dialects ([`schema::parse_format_string`], [`schema::parse_key_value`])
//! compile to one intermediate representation ([`schema::Schema`]) that
//! both [`codec::encode`]/[`codec::decode`] and the schemaless [`raw`]
//! codec are built on.

pub mod codec;
pub mod error;
pub mod leb128;
pub mod raw;
pub mod schema;
pub mod value;
mod wire;

pub use codec::{decode, encode};
pub use error::{CodecError, SchemaError};
pub use schema::Schema;
pub use value::Value;
pub use wire::WireType;
