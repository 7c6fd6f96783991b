//! [`Vcs`] implementation on top of libgit2.

use std::path::Path;

use git2::{
    build::CheckoutBuilder, Commit, Cred, CredentialType, Direction, ErrorCode, FetchOptions,
    IndexAddOption, Oid, PushOptions, RemoteCallbacks, Repository, ResetType, Signature,
    StatusOptions,
};
use keepsync_core::{Credential, Revision};

use crate::error::VcsError;
use crate::vcs::{Head, PullResult, RemoteRef, TreeState, Vcs};

/// libgit2 asks again after a rejected key; give up after this many tries.
const MAX_AUTH_ATTEMPTS: u8 = 3;

const FALLBACK_AUTHOR: (&str, &str) = ("keepsync", "keepsync@localhost");

/// Git backend. Stateless; each tick opens its own [`Repository`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GitVcs;

impl Vcs for GitVcs {
    type Checkout = Repository;

    fn open(&self, path: &Path) -> Result<Repository, VcsError> {
        let repo = Repository::open(path).map_err(|e| VcsError::NotACheckout {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })?;
        if repo.is_bare() {
            return Err(VcsError::NotACheckout {
                path: path.to_path_buf(),
                message: "repository is bare".to_string(),
            });
        }
        Ok(repo)
    }

    fn status(&self, repo: &Repository) -> Result<TreeState, VcsError> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);
        let statuses = repo.statuses(Some(&mut opts))?;
        Ok(if statuses.is_empty() {
            TreeState::Clean
        } else {
            TreeState::Dirty
        })
    }

    fn head(&self, repo: &Repository) -> Result<Head, VcsError> {
        let head = repo.head()?;
        let oid = head
            .target()
            .ok_or_else(|| VcsError::Backend("HEAD has no target".to_string()))?;
        let reference = if head.is_branch() {
            head.name().unwrap_or("HEAD").to_string()
        } else {
            "HEAD".to_string()
        };
        Ok(Head {
            reference,
            revision: revision(oid),
        })
    }

    fn list_remote_refs(
        &self,
        repo: &Repository,
        remote: &str,
        credential: Option<&Credential>,
    ) -> Result<Vec<RemoteRef>, VcsError> {
        let mut remote = find_remote(repo, remote)?;
        let connection =
            remote.connect_auth(Direction::Fetch, Some(remote_callbacks(credential)), None)?;
        let refs = connection
            .list()?
            .iter()
            .map(|head| RemoteRef {
                name: head.name().to_string(),
                revision: revision(head.oid()),
            })
            .collect();
        Ok(refs)
    }

    fn pull(
        &self,
        repo: &Repository,
        remote_name: &str,
        credential: Option<&Credential>,
        force: bool,
    ) -> Result<PullResult, VcsError> {
        let branch = current_branch(repo)?;
        let mut remote = find_remote(repo, remote_name)?;

        let tracking = format!("refs/remotes/{remote_name}/{branch}");
        let refspec = format!("+refs/heads/{branch}:{tracking}");
        let mut fetch_opts = FetchOptions::new();
        fetch_opts.remote_callbacks(remote_callbacks(credential));
        remote.fetch(&[refspec.as_str()], Some(&mut fetch_opts), None)?;

        let fetched = repo.find_reference(&tracking)?.peel_to_commit()?;
        let annotated = repo.find_annotated_commit(fetched.id())?;
        let (analysis, _) = repo.merge_analysis(&[&annotated])?;

        if analysis.is_up_to_date() {
            return Ok(PullResult::AlreadyUpToDate);
        }

        if analysis.is_fast_forward() {
            let refname = format!("refs/heads/{branch}");
            repo.find_reference(&refname)?.set_target(
                fetched.id(),
                &format!("keepsync pull: fast-forward to {}", fetched.id()),
            )?;
            repo.checkout_head(Some(CheckoutBuilder::default().force()))?;
            tracing::debug!("fast-forwarded {branch} to {}", fetched.id());
            return Ok(PullResult::Updated(revision(fetched.id())));
        }

        if !force {
            return Err(VcsError::NonFastForward {
                branch,
                remote_revision: fetched.id().to_string(),
            });
        }

        // Diverged and forced: the remote wins.
        repo.reset(fetched.as_object(), ResetType::Hard, None)?;
        tracing::debug!("force-reset {branch} to {}", fetched.id());
        Ok(PullResult::Updated(revision(fetched.id())))
    }

    fn stage_all(&self, repo: &Repository) -> Result<(), VcsError> {
        let mut index = repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"].iter(), None)?;
        index.write()?;
        Ok(())
    }

    fn commit(&self, repo: &Repository, message: &str) -> Result<Revision, VcsError> {
        let mut index = repo.index()?;
        let tree_id = index.write_tree()?;

        let parent = head_commit(repo)?;
        let unchanged = match &parent {
            Some(parent) => parent.tree_id() == tree_id,
            None => index.is_empty(),
        };
        if unchanged {
            return Err(VcsError::NothingToCommit);
        }

        let tree = repo.find_tree(tree_id)?;
        let signature = repo
            .signature()
            .or_else(|_| Signature::now(FALLBACK_AUTHOR.0, FALLBACK_AUTHOR.1))?;
        let parents: Vec<&Commit<'_>> = parent.iter().collect();
        let oid = repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parents,
        )?;
        Ok(revision(oid))
    }

    fn push(
        &self,
        repo: &Repository,
        remote_name: &str,
        credential: Option<&Credential>,
        force: bool,
    ) -> Result<(), VcsError> {
        let branch = current_branch(repo)?;
        let mut remote = find_remote(repo, remote_name)?;
        let prefix = if force { "+" } else { "" };
        let refspec = format!("{prefix}refs/heads/{branch}:refs/heads/{branch}");

        let mut rejection: Option<String> = None;
        {
            let mut callbacks = remote_callbacks(credential);
            callbacks.push_update_reference(|refname, status| {
                if let Some(status) = status {
                    rejection = Some(format!("{refname}: {status}"));
                }
                Ok(())
            });
            let mut push_opts = PushOptions::new();
            push_opts.remote_callbacks(callbacks);
            remote.push(&[refspec.as_str()], Some(&mut push_opts))?;
        }

        match rejection {
            Some(message) => Err(VcsError::Rejected { message }),
            None => Ok(()),
        }
    }

    fn hard_reset(&self, repo: &Repository, target: &Revision) -> Result<(), VcsError> {
        let oid = Oid::from_str(&target.0)?;
        let object = repo.find_object(oid, None)?;
        repo.reset(&object, ResetType::Hard, None)?;
        Ok(())
    }
}

fn revision(oid: Oid) -> Revision {
    Revision(oid.to_string())
}

fn find_remote<'r>(repo: &'r Repository, name: &str) -> Result<git2::Remote<'r>, VcsError> {
    repo.find_remote(name)
        .map_err(|_| VcsError::RemoteNotFound {
            name: name.to_string(),
        })
}

fn current_branch(repo: &Repository) -> Result<String, VcsError> {
    let head = repo.head()?;
    if !head.is_branch() {
        return Err(VcsError::DetachedHead);
    }
    head.shorthand()
        .map(str::to_string)
        .ok_or_else(|| VcsError::Backend("branch name is not valid UTF-8".to_string()))
}

/// HEAD's commit, or `None` on an unborn branch.
fn head_commit(repo: &Repository) -> Result<Option<Commit<'_>>, VcsError> {
    match repo.head() {
        Ok(head) => Ok(Some(head.peel_to_commit()?)),
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Callbacks for network operations; anonymous when `credential` is `None`.
fn remote_callbacks(credential: Option<&Credential>) -> RemoteCallbacks<'_> {
    let mut callbacks = RemoteCallbacks::new();
    if let Some(credential) = credential {
        let mut attempts = 0u8;
        callbacks.credentials(move |_url, username_from_url, allowed| {
            attempts += 1;
            if attempts > MAX_AUTH_ATTEMPTS {
                return Err(git2::Error::from_str("ssh authentication failed"));
            }
            let user = username_from_url.unwrap_or(credential.username());
            if allowed.contains(CredentialType::USERNAME) {
                return Cred::username(user);
            }
            if allowed.contains(CredentialType::SSH_KEY) {
                return Cred::ssh_key(
                    user,
                    None,
                    credential.private_key(),
                    credential.passphrase(),
                );
            }
            Err(git2::Error::from_str(
                "remote requested a credential type other than an ssh key",
            ))
        });
    }
    callbacks
}
