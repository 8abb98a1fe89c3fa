//! Slide metadata retrieval.
//!
//! `GetImageInfo` answers are cached per session under the slide path and,
//! for sessions on remote servers, under the slide's UID as well. The local
//! viewer computes UIDs per process, so they are not indexed for it.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use super::info::SlideInfo;
use crate::client::Client;
use crate::error::ClientError;
use crate::session::Session;
use crate::transport::{ApiUrl, Payload, Transport};

/// Strip a single leading `/` from a slide reference.
pub fn normalize_slide_ref(slide_ref: &str) -> &str {
    slide_ref.strip_prefix('/').unwrap_or(slide_ref)
}

impl<T: Transport> Client<T> {
    /// Metadata of one slide, fetched on first access and cached afterwards.
    ///
    /// `slide_ref` may be a path or a UID. A structured server error is
    /// returned as [`ClientError::Server`]; an answer that is neither a
    /// record nor a fault yields `Ok(None)`.
    pub async fn get_slide_info(
        &self,
        slide_ref: &str,
        session_id: Option<&str>,
    ) -> Result<Option<Arc<SlideInfo>>, ClientError> {
        let session = self.session(session_id).await?;
        self.slide_info_for(&session, slide_ref).await
    }

    pub(crate) async fn slide_info_for(
        &self,
        session: &Session,
        slide_ref: &str,
    ) -> Result<Option<Arc<SlideInfo>>, ClientError> {
        let key = normalize_slide_ref(slide_ref);

        let info = session
            .cache()
            .get_or_fetch(key, || async {
                let url = ApiUrl::new(&session.api_url(), "GetImageInfo")
                    .param("SessionID", session.id())
                    .param("pathOrUid", key);

                match self.api_get(session, "GetImageInfo", key, url).await? {
                    Payload::Object(map) => Ok(Some(SlideInfo::new(map))),
                    other => {
                        debug!("GetImageInfo for {} returned {}", key, other.kind());
                        Ok(None)
                    }
                }
            })
            .await?;

        if let Some(info) = &info {
            self.index_by_uid(session, info).await;
        }
        Ok(info)
    }

    /// Metadata for several slides, fetching every uncached one in a single
    /// batch request.
    ///
    /// Every requested reference appears as a key of the result; the value
    /// is `None` when the server returned nothing for it.
    pub async fn get_slides_info<S: AsRef<str>>(
        &self,
        slide_refs: &[S],
        session_id: Option<&str>,
    ) -> Result<HashMap<String, Option<Arc<SlideInfo>>>, ClientError> {
        let session = self.session(session_id).await?;

        let mut missing: Vec<String> = Vec::new();
        for slide_ref in slide_refs {
            let key = normalize_slide_ref(slide_ref.as_ref());
            if !session.cache().contains(key).await && !missing.iter().any(|m| m == key) {
                missing.push(key.to_string());
            }
        }

        if !missing.is_empty() {
            self.fetch_batch(&session, &missing).await?;
        }

        let mut result = HashMap::with_capacity(slide_refs.len());
        for slide_ref in slide_refs {
            let key = normalize_slide_ref(slide_ref.as_ref());
            result.insert(slide_ref.as_ref().to_string(), session.cache().get(key).await);
        }
        Ok(result)
    }

    async fn fetch_batch(&self, session: &Session, keys: &[String]) -> Result<(), ClientError> {
        let input = keys.join(", ");
        let url = ApiUrl::new(&session.api_url(), "GetImagesInfo");
        let body = json!({
            "sessionID": session.id(),
            "pathOrUids": keys,
        });

        let payload = self
            .api_post(session, "GetImagesInfo", &input, url, &body)
            .await?;
        let Some(items) = payload.into_array() else {
            return Err(ClientError::UnexpectedResponse {
                endpoint: "GetImagesInfo",
                reason: "expected an array of records".to_string(),
            });
        };

        // Records are matched to requests by Filename; positional matching
        // is only trusted when the server answered for every request.
        let positional = items.len() == keys.len();
        for (i, item) in items.into_iter().enumerate() {
            let Value::Object(map) = item else {
                continue;
            };
            let info = Arc::new(SlideInfo::new(map));

            if let Some(filename) = info.filename() {
                session
                    .cache()
                    .insert(normalize_slide_ref(filename), info.clone())
                    .await;
            }
            if positional {
                session.cache().insert(&keys[i], info.clone()).await;
            }
            self.index_by_uid(session, &info).await;
        }
        Ok(())
    }

    async fn index_by_uid(&self, session: &Session, info: &Arc<SlideInfo>) {
        if self.is_local(session) {
            return;
        }
        if let Some(uid) = info.uid() {
            session.cache().insert(uid, info.clone()).await;
        }
    }

    /// UID of a slide. Fails when the server has none.
    pub async fn get_uid(&self, slide_ref: &str, session_id: Option<&str>) -> Result<String, ClientError> {
        let session = self.session(session_id).await?;
        let key = normalize_slide_ref(slide_ref);
        let url = ApiUrl::new(&session.api_url(), "GetUID")
            .param("sessionID", session.id())
            .param("path", key);

        self.api_get(&session, "GetUID", key, url)
            .await?
            .into_string()
            .filter(|uid| !uid.is_empty())
            .ok_or_else(|| ClientError::NotFound {
                endpoint: "GetUID",
                input: key.to_string(),
            })
    }

    /// Content fingerprint of a slide.
    pub async fn get_fingerprint(
        &self,
        slide_ref: &str,
        session_id: Option<&str>,
    ) -> Result<Option<String>, ClientError> {
        let session = self.session(session_id).await?;
        let key = normalize_slide_ref(slide_ref);
        let url = ApiUrl::new(&session.api_url(), "GetFingerprint")
            .param("sessionID", session.id())
            .param("pathOrUid", key);

        Ok(self
            .api_get(&session, "GetFingerprint", key, url)
            .await?
            .into_string())
    }

    /// Text decoded from the slide's barcode, if any.
    pub async fn get_barcode_text(
        &self,
        slide_ref: &str,
        session_id: Option<&str>,
    ) -> Result<Option<String>, ClientError> {
        let session = self.session(session_id).await?;
        let key = normalize_slide_ref(slide_ref);
        let url = ApiUrl::new(&session.api_url(), "GetBarcodeText")
            .param("sessionID", session.id())
            .param("pathOrUid", key);

        Ok(self
            .api_get(&session, "GetBarcodeText", key, url)
            .await?
            .into_string()
            .filter(|text| !text.is_empty()))
    }
}
