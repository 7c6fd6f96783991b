//! Capability contract of the version-control backend.
//!
//! Each method is one atomic operation that can fail on its own. The engine
//! only orchestrates these calls; it never touches the checkout directly.

use std::path::Path;

use keepsync_core::{Credential, Revision};

use crate::error::VcsError;

/// Working-tree state relative to HEAD. Untracked files count as dirty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeState {
    Clean,
    Dirty,
}

/// The checked-out reference and the revision it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Head {
    /// Full reference name, e.g. `refs/heads/main`, or `HEAD` when detached.
    pub reference: String,
    pub revision: Revision,
}

impl Head {
    pub fn is_branch(&self) -> bool {
        self.reference.starts_with("refs/heads/")
    }

    /// Short branch name, if HEAD is on a branch.
    pub fn branch(&self) -> Option<&str> {
        self.reference.strip_prefix("refs/heads/")
    }
}

/// One entry of a remote reference listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRef {
    pub name: String,
    pub revision: Revision,
}

/// Result of a successful pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullResult {
    /// HEAD moved to the given revision.
    Updated(Revision),
    /// The remote had nothing new.
    AlreadyUpToDate,
}

/// Version-control operations consumed by the engine.
///
/// `credential` is `None` for anonymous or local transports.
pub trait Vcs {
    type Checkout;

    fn open(&self, path: &Path) -> Result<Self::Checkout, VcsError>;

    fn status(&self, checkout: &Self::Checkout) -> Result<TreeState, VcsError>;

    fn head(&self, checkout: &Self::Checkout) -> Result<Head, VcsError>;

    fn list_remote_refs(
        &self,
        checkout: &Self::Checkout,
        remote: &str,
        credential: Option<&Credential>,
    ) -> Result<Vec<RemoteRef>, VcsError>;

    fn pull(
        &self,
        checkout: &Self::Checkout,
        remote: &str,
        credential: Option<&Credential>,
        force: bool,
    ) -> Result<PullResult, VcsError>;

    /// Stage new, modified and deleted files.
    fn stage_all(&self, checkout: &Self::Checkout) -> Result<(), VcsError>;

    /// Commit the index on HEAD. Returns [`VcsError::NothingToCommit`] when
    /// the index matches HEAD.
    fn commit(&self, checkout: &Self::Checkout, message: &str) -> Result<Revision, VcsError>;

    /// Push the current branch to the same name on `remote`.
    fn push(
        &self,
        checkout: &Self::Checkout,
        remote: &str,
        credential: Option<&Credential>,
        force: bool,
    ) -> Result<(), VcsError>;

    /// Reset index and working tree to `revision`, discarding local edits.
    fn hard_reset(&self, checkout: &Self::Checkout, revision: &Revision) -> Result<(), VcsError>;
}
