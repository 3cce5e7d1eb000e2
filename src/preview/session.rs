use super::assembler::assemble_document;
use crate::files::VirtualFileSet;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

const URL_PREFIX: &str = "blob:vibecoder/";

/// Addressable reference to a served preview document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewHandle(String);

impl PreviewHandle {
    pub fn url(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Object-URL style store of assembled documents.
///
/// Every issued URL stays live (and its document in memory) until revoked.
#[derive(Debug, Default)]
pub struct DocumentRegistry {
    documents: DashMap<String, Arc<str>>,
}

impl DocumentRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn issue(&self, html: String) -> PreviewHandle {
        let url = format!("{}{}", URL_PREFIX, Uuid::new_v4());
        self.documents.insert(url.clone(), Arc::from(html));
        PreviewHandle(url)
    }

    /// Returns false when the handle was already revoked.
    pub fn revoke(&self, handle: &PreviewHandle) -> bool {
        self.documents.remove(handle.url()).is_some()
    }

    pub fn fetch(&self, url: &str) -> Option<Arc<str>> {
        self.documents.get(url).map(|doc| Arc::clone(doc.value()))
    }

    /// Number of documents not yet revoked.
    pub fn live(&self) -> usize {
        self.documents.len()
    }
}

/// Capability that frees a preview document. Dropping it releases too.
#[derive(Debug)]
pub struct Release {
    registry: Arc<DocumentRegistry>,
    handle: Option<PreviewHandle>,
}

impl Release {
    pub fn release(mut self) {
        self.revoke();
    }

    fn revoke(&mut self) {
        if let Some(handle) = self.handle.take() {
            if self.registry.revoke(&handle) {
                debug!(url = %handle, "released preview document");
            }
        }
    }
}

impl Drop for Release {
    fn drop(&mut self) {
        self.revoke();
    }
}

/// A live preview: the handle plus the capability that frees it.
#[derive(Debug)]
pub struct PreviewSession {
    handle: PreviewHandle,
    release: Release,
}

impl PreviewSession {
    pub fn acquire(registry: &Arc<DocumentRegistry>, html: String) -> Self {
        let handle = registry.issue(html);
        Self {
            release: Release {
                registry: Arc::clone(registry),
                handle: Some(handle.clone()),
            },
            handle,
        }
    }

    pub fn handle(&self) -> &PreviewHandle {
        &self.handle
    }

    pub fn document(&self) -> Option<Arc<str>> {
        self.release.registry.fetch(self.handle.url())
    }

    pub fn release(self) {
        self.release.release();
    }
}

/// Holds at most one live preview; rendering again releases the previous one first.
#[derive(Debug)]
pub struct PreviewSlot {
    registry: Arc<DocumentRegistry>,
    current: Option<PreviewSession>,
}

impl PreviewSlot {
    pub fn new(registry: Arc<DocumentRegistry>) -> Self {
        Self {
            registry,
            current: None,
        }
    }

    /// Assemble `files` and make the result the live preview.
    ///
    /// Without an `index.html` the slot ends up empty.
    pub fn render(&mut self, files: &VirtualFileSet) -> Option<&PreviewSession> {
        self.clear();

        let html = assemble_document(files)?;
        let session = PreviewSession::acquire(&self.registry, html);
        info!(url = %session.handle(), "preview ready");
        self.current = Some(session);
        self.current.as_ref()
    }

    pub fn current(&self) -> Option<&PreviewSession> {
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        if let Some(previous) = self.current.take() {
            previous.release();
        }
    }

    pub fn registry(&self) -> &Arc<DocumentRegistry> {
        &self.registry
    }
}

impl Drop for PreviewSlot {
    fn drop(&mut self) {
        self.clear();
    }
}
