// SPDX-License-Identifier: MIT OR Apache-2.0
//! Material graph documents for `mxview`.
//!
//! This crate owns the declarative side of the viewer:
//! - Element tree and typed values
//! - XML reading with include support
//! - Library loading and merging
//! - Document modifiers (remap / skip / file prefix)
//! - Node-definition implementation resolution
//! - Renderable element discovery and material subsets
//!
//! ## Architecture
//!
//! A [`Document`] is an owned tree of [`Element`]s. Renderable elements are
//! referenced by name path, so selections stay valid for as long as the
//! document they were discovered in.

pub mod element;
pub mod value;
pub mod document;
pub mod search_path;
pub mod xml;
pub mod modifiers;
pub mod resolve;
pub mod renderable;
pub mod loader;
mod error;

pub use document::Document;
pub use element::Element;
pub use error::DocumentError;
pub use loader::{load_libraries, DocumentLoader, LoadedDocument, MaterialSubset};
pub use modifiers::DocumentModifiers;
pub use renderable::{find_renderable_elements, RenderableElement, RenderableKind};
pub use resolve::{
    remap_unimplemented_shader_refs, resolve_element, resolve_implementation,
    ImplementationHandle, ImplementationTarget, ResolveError,
};
pub use search_path::FileSearchPath;
pub use value::{TypeDesc, Value, ValueError};

/// Token replaced by a UDIM tile identifier in texture filenames.
pub const UDIM_TOKEN: &str = "<UDIM>";
