use crate::protocol::ChangeKind;

/// Label used when the mutated node is the document itself.
pub const DOCUMENT_LABEL: &str = "Document";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    ChildList,
    Attributes,
    CharacterData,
}

/// One observed mutation, as a DOM mutation observer would report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    /// Tag of the mutated element; `None` for the document node.
    pub target: Option<String>,
    pub added: usize,
    pub removed: usize,
}

impl MutationRecord {
    pub fn added(target: impl Into<String>, count: usize) -> Self {
        Self {
            kind: MutationKind::ChildList,
            target: Some(target.into()),
            added: count,
            removed: 0,
        }
    }

    pub fn removed(target: impl Into<String>, count: usize) -> Self {
        Self {
            kind: MutationKind::ChildList,
            target: Some(target.into()),
            added: 0,
            removed: count,
        }
    }

    pub fn attribute(target: impl Into<String>) -> Self {
        Self {
            kind: MutationKind::Attributes,
            target: Some(target.into()),
            added: 0,
            removed: 0,
        }
    }

    /// Only element insertions/removals are recorded.
    pub fn is_structural(&self) -> bool {
        self.kind == MutationKind::ChildList && (self.added > 0 || self.removed > 0)
    }

    /// Added wins when a record both adds and removes.
    pub fn change_kind(&self) -> ChangeKind {
        if self.added > 0 {
            ChangeKind::Added
        } else {
            ChangeKind::Removed
        }
    }

    pub fn label(&self) -> &str {
        self.target.as_deref().unwrap_or(DOCUMENT_LABEL)
    }
}
