//! BER (Basic Encoding Rules) codec for SNMP.
//!
//! Definite-length X.690 encoding only. Decoding is permissive in the same
//! places net-snmp is (non-minimal lengths and integers) and strict everywhere
//! else: indefinite lengths, oversized length fields and truncated TLVs are
//! rejected with a decode error.

mod decode;
mod encode;
mod length;
pub mod tag;

pub use decode::*;
pub use encode::*;
pub use length::*;
pub use tag::*;
