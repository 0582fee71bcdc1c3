//! Title patching for audio pages.

mod document;
mod patcher;

pub use document::{patch, Document, Slot, SlotKind};
pub use patcher::{backup_path, patch_document, PatchOutcome};

/// Audio URL to title.
pub type PatchMapping = std::collections::BTreeMap<String, String>;
