//! Fileset identity sent with every signing and finalize call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Project owner, identified by nickname.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub nickname: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub nickname: String,
    pub owner: Owner,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub email: String,
}

/// Source-control metadata describing what a fileset was built from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub has_unstaged_changes: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

/// A named collection of object paths under a project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fileset {
    pub name: String,
    pub project: Project,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<Commit>,
}

impl Fileset {
    pub fn new(owner: impl Into<String>, project: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            project: Project {
                nickname: project.into(),
                owner: Owner {
                    nickname: owner.into(),
                },
            },
            commit: None,
        }
    }

    pub fn with_commit(mut self, commit: Commit) -> Self {
        self.commit = Some(commit);
        self
    }

    /// `<owner>/<project>` form, as users type it.
    pub fn project_slug(&self) -> String {
        format!("{}/{}", self.project.owner.nickname, self.project.nickname)
    }
}

/// Body of the `finalize` RPC.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinalizeRequest {
    pub fileset: Fileset,
}
