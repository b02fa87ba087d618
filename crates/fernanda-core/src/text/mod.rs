//! Text file model: one prime document plus N per-view local documents kept
//! identical by synchronous delta relay.
//!
//! When a view edits its local document, the delta (position, removed count,
//! added text) is applied to the prime document and to every other local
//! document. A routing flag guards against re-entrant relays: applying a
//! delta to a sibling document must not route again. Undo and redo run on
//! the prime document only and are replayed outward, with the last delta's
//! end position reported as a cursor hint for the focused view.

pub mod document;

#[cfg(test)]
mod tests;

use log::info;

use crate::files::meta::FileMeta;
use crate::files::model::FileModel;

pub use document::{Delta, Document, PrimeDocument};

const TITLE_MAX_CHARS: usize = 27;

/// Handle for a per-view local document registered with a text model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewDocId(u32);

pub struct TextFileModel {
    meta: FileMeta,
    prime: PrimeDocument,
    view_docs: Vec<(ViewDocId, Document)>,
    next_view_doc: u32,
    routing_delta: bool,
}

/// Replace carriage returns and the Unicode paragraph separator with `\n`
/// so every document stores one newline form.
pub fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\u{2029}', "\n")
}

impl TextFileModel {
    pub fn new(meta: FileMeta) -> Self {
        Self {
            meta,
            prime: PrimeDocument::new(),
            view_docs: Vec::new(),
            next_view_doc: 0,
            routing_delta: false,
        }
    }

    // ------------------------------------------------------------------------
    // View document lifecycle
    // ------------------------------------------------------------------------

    /// Attach a per-view document initialized from the prime content. The
    /// local document has no undo of its own; history lives on the prime.
    pub fn register_view_document(&mut self) -> ViewDocId {
        let id = ViewDocId(self.next_view_doc);
        self.next_view_doc += 1;

        // Initialization happens under a routing scope in spirit: it is not
        // an edit and must not produce an undo record.
        self.view_docs
            .push((id, Document::from_text(self.prime.text())));

        info!(
            "local view document registered [{id:?}], total views: {}",
            self.view_docs.len()
        );

        id
    }

    pub fn unregister_view_document(&mut self, id: ViewDocId) {
        self.view_docs.retain(|(doc_id, _)| *doc_id != id);
    }

    pub fn view_count(&self) -> usize {
        self.view_docs.len()
    }

    pub fn view_text(&self, id: ViewDocId) -> Option<&str> {
        self.view_docs
            .iter()
            .find(|(doc_id, _)| *doc_id == id)
            .map(|(_, doc)| doc.text())
    }

    pub fn prime_text(&self) -> &str {
        self.prime.text()
    }

    pub fn char_count(&self) -> usize {
        self.prime.char_count()
    }

    // ------------------------------------------------------------------------
    // Delta routing
    // ------------------------------------------------------------------------

    /// An edit entered at one view: apply it to that view's local document,
    /// then relay the delta to the prime document and every other view.
    pub fn edit(&mut self, source: ViewDocId, pos: usize, removed: usize, text: &str) {
        if self.routing_delta {
            return;
        }

        let added = normalize_newlines(text);

        let Some(source_doc) = self
            .view_docs
            .iter_mut()
            .find(|(doc_id, _)| *doc_id == source)
        else {
            return;
        };

        source_doc.1.apply(pos, removed, &added);
        let added_count = added.chars().count();
        self.on_local_view_contents_change(source, pos, removed, added_count);
    }

    /// Route a local document's change to the prime document and to every
    /// other local document. The added text is extracted from the source
    /// document at `[pos, pos + added)`.
    fn on_local_view_contents_change(
        &mut self,
        source: ViewDocId,
        pos: usize,
        removed: usize,
        added: usize,
    ) {
        if self.routing_delta {
            return;
        }
        self.routing_delta = true;

        let added_text = self
            .view_docs
            .iter()
            .find(|(doc_id, _)| *doc_id == source)
            .map(|(_, doc)| doc.slice(pos, added))
            .unwrap_or_default();

        self.prime.apply_edit(pos, removed, &added_text);

        for (doc_id, doc) in &mut self.view_docs {
            if *doc_id != source {
                doc.apply(pos, removed, &added_text);
            }
        }

        self.routing_delta = false;
        self.assert_sync("on_local_view_contents_change");
        self.refresh_title_override();
    }

    // ------------------------------------------------------------------------
    // Undo/redo replay
    // ------------------------------------------------------------------------

    /// Undo on the prime document, fanning each reverted delta out to every
    /// local document. Returns the cursor hint: the end position of the
    /// last delta. For a compound step spanning distant regions the hint is
    /// the last delta only, an accepted approximation.
    pub fn undo(&mut self) -> Option<usize> {
        if self.routing_delta {
            return None;
        }
        self.replay_prime_operation(PrimeDocument::undo)
    }

    /// Redo on the prime document; same replay and hint contract as undo.
    pub fn redo(&mut self) -> Option<usize> {
        if self.routing_delta {
            return None;
        }
        self.replay_prime_operation(PrimeDocument::redo)
    }

    fn replay_prime_operation(
        &mut self,
        operation: fn(&mut PrimeDocument) -> Vec<Delta>,
    ) -> Option<usize> {
        self.routing_delta = true;

        let mut hint = None;
        for delta in operation(&mut self.prime) {
            for (_, doc) in &mut self.view_docs {
                doc.apply(delta.position, delta.removed, &delta.added);
            }
            hint = Some(delta.position + delta.added.chars().count());
        }

        self.routing_delta = false;
        self.assert_sync("replay_prime_operation");
        self.refresh_title_override();
        hint
    }

    // ------------------------------------------------------------------------
    // Compound edits
    // ------------------------------------------------------------------------

    /// Call before a sequence of edits that should undo/redo as one step.
    pub fn begin_compound_edit(&mut self) {
        self.prime.begin_edit_block();
    }

    pub fn end_compound_edit(&mut self) {
        self.prime.end_edit_block();
    }

    /// Every local document must mirror the prime exactly; divergence is a
    /// fatal relay bug.
    fn assert_sync(&self, context: &str) {
        #[cfg(debug_assertions)]
        {
            let prime_text = self.prime.text();
            for (id, doc) in &self.view_docs {
                let view_text = doc.text();
                if view_text != prime_text {
                    let diverge = prime_text
                        .chars()
                        .zip(view_text.chars())
                        .position(|(a, b)| a != b)
                        .unwrap_or_else(|| prime_text.chars().count().min(doc.char_count()));

                    panic!(
                        "document drift detected in {context}: view {id:?} out of sync \
                         (prime len={}, view len={}, first divergence at pos={diverge})",
                        prime_text.len(),
                        view_text.len(),
                    );
                }
            }
        }
        #[cfg(not(debug_assertions))]
        let _ = context;
    }

    // ------------------------------------------------------------------------
    // Title derivation for off-disk files
    // ------------------------------------------------------------------------

    /// Derive a display title from the first non-blank line: trimmed,
    /// truncated to 27 characters, `...` appended when longer. An empty
    /// document clears the override so consumers fall back to the default.
    fn refresh_title_override(&mut self) {
        if self.meta.is_on_disk() {
            return;
        }

        for line in self.prime.text().lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let mut title: String = line.chars().take(TITLE_MAX_CHARS).collect();
            if line.chars().count() > TITLE_MAX_CHARS {
                title.push_str("...");
            }

            self.meta.set_title_override(&title);
            return;
        }

        self.meta.clear_title_override();
    }
}

impl FileModel for TextFileModel {
    fn meta(&self) -> &FileMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut FileMeta {
        &mut self.meta
    }

    fn data(&self) -> Vec<u8> {
        self.prime.text().as_bytes().to_vec()
    }

    /// Reset the whole content, discarding history, and resynchronize every
    /// local document.
    fn set_data(&mut self, data: &[u8]) {
        let text = normalize_newlines(&String::from_utf8_lossy(data));

        self.routing_delta = true;
        self.prime.set_text(&text);
        for (_, doc) in &mut self.view_docs {
            doc.set_text(&text);
        }
        self.routing_delta = false;

        self.assert_sync("set_data");
        self.refresh_title_override();
    }

    fn preferred_extension(&self) -> &'static str {
        ".txt"
    }

    fn supports_modification(&self) -> bool {
        true
    }

    fn is_modified(&self) -> bool {
        self.prime.is_modified()
    }

    fn set_modified(&mut self, modified: bool) {
        self.prime.set_modified(modified);
    }

    fn has_undo(&self) -> bool {
        self.prime.has_undo()
    }

    fn has_redo(&self) -> bool {
        self.prime.has_redo()
    }

    fn as_text(&self) -> Option<&TextFileModel> {
        Some(self)
    }

    fn as_text_mut(&mut self) -> Option<&mut TextFileModel> {
        Some(self)
    }
}
