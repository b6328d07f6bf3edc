//! Share links
//!
//! A share link names the stored ciphertext in its path and carries the key
//! in its fragment, which browsers and HTTP clients never send to the
//! server:
//!
//! - text secrets: `<base>/g/<id>#<key>`
//! - files: `<base>/file/<id>#<key>` (file ids carry an `spf-` prefix)
//!
//! Ids are opaque here; only their placement in the path is interpreted.

use percent_encoding::percent_decode_str;
use url::Url;
use zeroize::Zeroizing;

use crate::error::{ErrorCategory, ErrorKind, Result, SealnoteError};

const SECRET_SEGMENT: &str = "g";
const FILE_SEGMENT: &str = "file";

/// What a link points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    Secret(String),
    File(String),
}

impl LinkTarget {
    pub fn id(&self) -> &str {
        match self {
            LinkTarget::Secret(id) | LinkTarget::File(id) => id,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub target: LinkTarget,
    pub key: Zeroizing<String>,
}

impl std::fmt::Debug for ShareLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareLink")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl ShareLink {
    pub fn new(target: LinkTarget, key: Zeroizing<String>) -> Self {
        Self { target, key }
    }

    /// Builds the full link under `base`, which may itself have a path.
    pub fn to_url(&self, base: &Url) -> Result<Url> {
        let (segment, id) = match &self.target {
            LinkTarget::Secret(id) => (SECRET_SEGMENT, id),
            LinkTarget::File(id) => (FILE_SEGMENT, id),
        };
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|()| invalid_link(format!("{} cannot be used as a base url", base)))?
            .pop_if_empty()
            .push(segment)
            .push(id);
        url.set_query(None);
        url.set_fragment(Some(self.key.as_str()));
        Ok(url)
    }

    /// Parses a link, taking the target from the last two path segments and
    /// the key from the fragment.
    pub fn parse(link: &str) -> Result<Self> {
        let url = Url::parse(link.trim()).map_err(|e| {
            SealnoteError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::InvalidLink,
                "share link is not a valid url",
                e,
            )
        })?;

        let key = match url.fragment() {
            Some(fragment) if !fragment.is_empty() => Zeroizing::new(fragment.to_owned()),
            _ => return Err(invalid_link("share link has no key after '#'")),
        };

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();
        let target = match segments.as_slice() {
            [.., kind, id] if *kind == SECRET_SEGMENT => LinkTarget::Secret(decode_id(id)?),
            [.., kind, id] if *kind == FILE_SEGMENT => LinkTarget::File(decode_id(id)?),
            _ => {
                return Err(invalid_link(format!(
                    "share link path must end in /{}/<id> or /{}/<id>",
                    SECRET_SEGMENT, FILE_SEGMENT
                )));
            }
        };

        Ok(Self { target, key })
    }
}

/// Undoes the escaping `to_url` applies, so ids come back byte-for-byte.
fn decode_id(segment: &str) -> Result<String> {
    percent_decode_str(segment)
        .decode_utf8()
        .map(|id| id.into_owned())
        .map_err(|e| {
            SealnoteError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::InvalidLink,
                "share link id is not valid UTF-8",
                e,
            )
        })
}

fn invalid_link(msg: impl Into<String>) -> SealnoteError {
    SealnoteError::with_kind(ErrorCategory::User, ErrorKind::InvalidLink, msg)
}
