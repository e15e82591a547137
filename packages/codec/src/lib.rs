//! # Knecht Codec
//!
//! Reads and writes the tagged variant exchange format.
//!
//! ```text
//! <renderknecht_varianten>
//!   <origin/>
//!   <renderknecht_settings/>
//!   <variant_presets>
//!     <preset order="000" name="P1" type="trim_setup" id="1">
//!       <variant order="000" name="Color" value="red"/>
//!     </preset>
//!   </variant_presets>
//! </renderknecht_varianten>
//! ```
//!
//! Identities never hit the wire in full. [`encode`] compacts every id to a
//! small sequential integer and [`decode`] mints a fresh identity for every
//! distinct integer it meets.

pub mod error;
pub mod escape;
pub mod id_table;
pub mod lexer;
pub mod reader;
pub mod writer;

pub use error::{CodecError, CodecResult};
pub use id_table::{IdCompactor, IdExpander};
pub use reader::{decode, Reader};
pub use writer::{encode, Writer};

#[cfg(feature = "pretty-errors")]
pub use error::format_error;

/// Root element of every exchange document
pub const ROOT_TAG: &str = "renderknecht_varianten";

/// Element holding the node tree
pub const PRESETS_TAG: &str = "variant_presets";

pub const ORIGIN_TAG: &str = "origin";

pub const SETTINGS_TAG: &str = "renderknecht_settings";
