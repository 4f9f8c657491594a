//! # patricia-dict
//!
//! A persistent dictionary from byte-string keys to `u64` values, stored in a
//! PATRICIA (critical-bit) trie and saved to disk in a compact tagged format.
//!
//! ## Example
//!
//! ```rust
//! use patricia_dict::{DictError, PatriciaTrie};
//!
//! let mut dict = PatriciaTrie::new();
//! dict.insert(b"cat", 1).unwrap();
//! dict.insert(b"dog", 3).unwrap();
//! assert!(matches!(dict.insert(b"cat", 9), Err(DictError::DuplicateKey)));
//!
//! assert_eq!(dict.get(b"cat"), Some(1));
//! assert_eq!(dict.get(b"cow"), None);
//!
//! let mut bytes = Vec::new();
//! patricia_dict::codec::encode(&dict, &mut bytes).unwrap();
//! let copy = patricia_dict::codec::decode(bytes.as_slice()).unwrap();
//! assert_eq!(copy.get(b"dog"), Some(3));
//! ```
//!
//! The [`command`] module implements the text protocol used by the
//! `patricia-dict` binary (`+ word value`, `- word`, `word`, `! Save path`,
//! `! Load path`).

#![deny(unsafe_code)]

mod bits;
pub mod codec;
pub mod command;
pub mod config;
pub mod error;
pub mod trie;

pub use command::{Command, Response, Session};
pub use config::Config;
pub use error::{DictError, Result};
pub use trie::{Iter, PatriciaTrie};

#[cfg(test)]
mod proptests;
