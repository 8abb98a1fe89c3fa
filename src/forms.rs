//! Forms and annotations attached to slides.
//!
//! Form definitions, submissions and annotations are returned as loosely
//! typed JSON records; only the form list is reshaped, into an id to name
//! map.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::client::Client;
use crate::error::ClientError;
use crate::session::Session;
use crate::slide::normalize_slide_ref;
use crate::transport::{ApiUrl, Payload, Transport};

impl<T: Transport> Client<T> {
    /// Forms available for a directory (all forms when `dir` is `None`),
    /// as form id to form name.
    pub async fn get_available_forms(
        &self,
        dir: Option<&str>,
        session_id: Option<&str>,
    ) -> Result<BTreeMap<String, String>, ClientError> {
        let session = self.session(session_id).await?;
        let path = dir.map(normalize_slide_ref);
        let url = ApiUrl::new(&session.api_url(), "GetForms")
            .param("sessionID", session.id())
            .param_opt("path", path);

        let payload = self
            .api_get(&session, "GetForms", path.unwrap_or("/"), url)
            .await?;
        forms_from_payload(payload).ok_or_else(|| ClientError::UnexpectedResponse {
            endpoint: "GetForms",
            reason: "expected a list of {Key, Value} entries".to_string(),
        })
    }

    /// Definitions of the given forms (all forms when `form_ids` is empty).
    pub async fn get_form_definitions<S: AsRef<str>>(
        &self,
        form_ids: &[S],
        session_id: Option<&str>,
    ) -> Result<Vec<Value>, ClientError> {
        let session = self.session(session_id).await?;
        let ids = join(form_ids);
        let url = ApiUrl::new(&session.api_url(), "GetFormDefinitions")
            .param("sessionID", session.id())
            .param_opt("formIDs", Some(ids.as_str()).filter(|ids| !ids.is_empty()));

        self.records(&session, "GetFormDefinitions", &ids, url).await
    }

    /// Submissions of the given forms for the given slides.
    pub async fn get_form_submissions<S: AsRef<str>, F: AsRef<str>>(
        &self,
        slide_refs: &[S],
        form_ids: &[F],
        session_id: Option<&str>,
    ) -> Result<Vec<Value>, ClientError> {
        let session = self.session(session_id).await?;
        let slides = slide_refs
            .iter()
            .map(|s| normalize_slide_ref(s.as_ref()))
            .collect::<Vec<_>>()
            .join(",");
        let ids = join(form_ids);
        let url = ApiUrl::new(&session.api_url(), "GetFormSubmissions")
            .param("sessionID", session.id())
            .param("pathOrUids", &slides)
            .param_opt("formIDs", Some(ids.as_str()).filter(|ids| !ids.is_empty()));

        self.records(&session, "GetFormSubmissions", &slides, url)
            .await
    }

    /// Annotations drawn on a slide.
    pub async fn get_annotations(
        &self,
        slide_ref: &str,
        session_id: Option<&str>,
    ) -> Result<Vec<Value>, ClientError> {
        let session = self.session(session_id).await?;
        let key = normalize_slide_ref(slide_ref);
        let url = ApiUrl::new(&session.api_url(), "GetAnnotations")
            .param("sessionID", session.id())
            .param("pathOrUid", key);

        self.records(&session, "GetAnnotations", key, url).await
    }

    async fn records(
        &self,
        session: &Session,
        endpoint: &'static str,
        input: &str,
        url: ApiUrl,
    ) -> Result<Vec<Value>, ClientError> {
        match self.api_get(session, endpoint, input, url).await? {
            Payload::Object(map) => Ok(vec![Value::Object(map)]),
            other => other
                .into_array()
                .ok_or_else(|| ClientError::UnexpectedResponse {
                    endpoint,
                    reason: "expected a list of records".to_string(),
                }),
        }
    }
}

fn join<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(",")
}

/// Read `[{"Key": id, "Value": name}, ...]` (or a plain object) into a map.
fn forms_from_payload(payload: Payload) -> Option<BTreeMap<String, String>> {
    let text = |value: &Value| match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    match payload {
        Payload::Object(map) => Some(map.iter().map(|(k, v)| (k.clone(), text(v))).collect()),
        other => {
            let mut forms = BTreeMap::new();
            for entry in other.into_array()? {
                let (Some(key), Some(value)) = (entry.get("Key"), entry.get("Value")) else {
                    continue;
                };
                forms.insert(text(key), text(value));
            }
            Some(forms)
        }
    }
}
