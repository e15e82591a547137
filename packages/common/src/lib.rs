//! # Knecht Common
//!
//! Shared vocabulary of the variant document engine: item identities, the
//! fixed column schema, typed cell rows, item kinds derived from the type
//! column, and detached [`NodeData`] subtrees that move between the codec,
//! the document and the clipboard.

pub mod data;
pub mod error;
pub mod id;
pub mod kind;
pub mod result;
pub mod schema;

pub use data::*;
pub use error::*;
pub use id::*;
pub use kind::*;
pub use result::*;
pub use schema::*;
