//! Request-boundary normalization of loosely typed form fields.

use serde::Deserialize;

use crate::errors::{GraphError, GraphResult};
use crate::media::MediaUpload;
use crate::posts::NewPost;
use crate::types::PostStatus;

/// Tagged friends as they arrive from multipart forms: either a real JSON array, or a string that
/// holds a JSON array or a comma separated list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TaggedFriendsPayload {
    List(Vec<String>),
    Encoded(String),
}

impl TaggedFriendsPayload {
    pub fn into_ids(self) -> GraphResult<Vec<String>> {
        let ids = match self {
            Self::List(ids) => ids,
            Self::Encoded(raw) => {
                let raw = raw.trim();
                if raw.is_empty() {
                    Vec::new()
                } else if raw.starts_with('[') {
                    serde_json::from_str::<Vec<String>>(raw)
                        .map_err(|err| GraphError::invalid(format!("tagged friends is not a list of ids: {err}")))?
                } else {
                    raw.split(',').map(str::to_string).collect()
                }
            }
        };
        Ok(ids
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect())
    }
}

/// Text fields of a post creation form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostForm {
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub audio_id: Option<String>,
    #[serde(default)]
    pub tagged_friends: Option<TaggedFriendsPayload>,
}

impl PostForm {
    pub fn into_new_post(self, image: Option<MediaUpload>, video: Option<MediaUpload>) -> GraphResult<NewPost> {
        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<PostStatus>()?),
        };
        let tagged_friends = match self.tagged_friends {
            Some(payload) => payload.into_ids()?,
            None => Vec::new(),
        };
        Ok(NewPost {
            caption: self.caption,
            image,
            video,
            audio_id: self.audio_id.filter(|id| !id.trim().is_empty()),
            tagged_friends,
            status,
        })
    }
}
