//! Assistant transport port and request validation.
//!
//! The external assistant is a black box reached over HTTP; this module only
//! defines how the core talks to it.

pub mod transport;
pub mod validate;
