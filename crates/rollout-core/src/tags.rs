//! Registry references and the two-entry tag set a release is published under.

use std::fmt;

use serde::Serialize;

use crate::event::ReleaseEvent;

/// The mutable pointer every release moves.
pub const LATEST_TAG: &str = "latest";

/// Host name of the private registry for an account in a region.
pub fn registry_host(account_id: &str, region: &str) -> String {
    format!("{account_id}.dkr.ecr.{region}.amazonaws.com")
}

/// A fully qualified `<host>/<repository>:<tag>` reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRef {
    pub host: String,
    pub repository: String,
    pub tag: String,
}

impl ImageRef {
    pub fn new(host: &str, repository: &str, tag: &str) -> Self {
        Self {
            host: host.to_owned(),
            repository: repository.to_owned(),
            tag: tag.to_owned(),
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.host, self.repository, self.tag)
    }
}

/// Logical name of a tag set entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TagName {
    Latest,
    Commit,
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str("latest"),
            Self::Commit => f.write_str("commit"),
        }
    }
}

/// The pointers one image is published under: always exactly `latest` and
/// the short commit, in the same repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagSet {
    latest: ImageRef,
    commit: ImageRef,
}

impl TagSet {
    /// Derive the tag set for `event` in `repository` on `host`.
    pub fn for_event(host: &str, repository: &str, event: &ReleaseEvent) -> Self {
        Self {
            latest: ImageRef::new(host, repository, LATEST_TAG),
            commit: ImageRef::new(host, repository, event.short_commit()),
        }
    }

    pub fn latest(&self) -> &ImageRef {
        &self.latest
    }

    pub fn commit(&self) -> &ImageRef {
        &self.commit
    }

    /// Entries in push order: the mutable pointer first, then the commit tag.
    pub fn entries(&self) -> [(TagName, &ImageRef); 2] {
        [
            (TagName::Latest, &self.latest),
            (TagName::Commit, &self.commit),
        ]
    }

    pub fn host(&self) -> &str {
        &self.latest.host
    }

    pub fn repository(&self) -> &str {
        &self.latest.repository
    }
}
