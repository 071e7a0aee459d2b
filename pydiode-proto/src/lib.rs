#![warn(rust_2018_idioms)]
#![allow(dead_code)]

//! Wire format, Reed-Solomon FEC, and block reassembly for pydiode, a
//! unidirectional reliable-datagram transfer protocol over UDP.

pub mod assembler;
pub mod chunk;
pub mod config;
pub mod encode;
pub mod error;
pub mod packet;
pub mod rs;

pub use config::SessionConfig;
pub use error::{Error, Result};
