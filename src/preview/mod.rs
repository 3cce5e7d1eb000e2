//! # Preview assembly
//!
//! Turns a virtual file set into one self-contained HTML document for a
//! sandboxed frame:
//! - local stylesheets, scripts and images are inlined (remote ones are kept)
//! - TypeScript script tags are removed
//! - the bridge script from [`instrument`] is injected before `</head>`
//!
//! The document is then served through a [`DocumentRegistry`] and owned by a
//! [`PreviewSession`]; a [`PreviewSlot`] keeps exactly one session alive.
//!
//! ## Example
//! ```ignore
//! let registry = DocumentRegistry::new();
//! let mut slot = PreviewSlot::new(registry.clone());
//! if let Some(session) = slot.render(&files) {
//!     frame.navigate(session.handle().url());
//! }
//! ```

pub mod assembler;
pub mod instrument;
pub mod session;

pub use assembler::assemble_document;
pub use session::{DocumentRegistry, PreviewHandle, PreviewSession, PreviewSlot, Release};
