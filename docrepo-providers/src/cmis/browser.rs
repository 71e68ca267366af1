// SPDX-License-Identifier: AGPL-3.0-or-later
//! CMIS browser binding session
//!
//! JSON over HTTP. The service URL lists the repositories; object, children,
//! parents and content requests go to the root folder URL with a
//! `cmisselector` query parameter.

use async_trait::async_trait;
use docrepo_core::{config::CmisSettings, path, RepoError, RepoResult};
use futures::StreamExt;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, info};

use super::{BaseTypeId, CmisObject, CmisSession, ContentStream};

const PROVIDER: &str = "cmis";
const PAGE_SIZE: u32 = 100;

/// Repository description returned by the service URL
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryInfo {
    repository_id: String,
    root_folder_id: String,
    root_folder_url: String,
}

#[derive(Debug, Deserialize)]
struct ObjectData {
    #[serde(rename = "succinctProperties", default)]
    properties: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ObjectInFolder {
    object: ObjectData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChildrenPage {
    #[serde(default)]
    objects: Vec<ObjectInFolder>,
    #[serde(default)]
    has_more_items: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectParent {
    object: ObjectData,
    relative_path_segment: Option<String>,
}

/// Session over the CMIS browser binding
pub struct BrowserBindingSession {
    http: Client,
    user: String,
    password: String,
    repository: RepositoryInfo,
}

impl BrowserBindingSession {
    /// Fetch the repository list and bind to the configured repository
    pub async fn connect(settings: &CmisSettings) -> RepoResult<Self> {
        if !settings.is_configured() {
            return Err(RepoError::Config("CMIS host is not configured".into()));
        }
        info!("Connecting to CMIS repository {} at {}", settings.repository_id, settings.host);

        let http = Client::new();
        let request = http
            .get(&settings.host)
            .basic_auth(&settings.user, Some(&settings.password));
        let response = check_status(send(request).await?, &settings.host).await?;
        let repositories: HashMap<String, RepositoryInfo> = response
            .json()
            .await
            .map_err(|e| api_error(format!("invalid repository list: {}", e)))?;

        let repository = select_repository(repositories, &settings.repository_id)?;
        debug!("Bound to CMIS repository {}", repository.repository_id);

        Ok(Self {
            http,
            user: settings.user.clone(),
            password: settings.password.clone(),
            repository,
        })
    }

    fn request(&self, selector: &str, object_id: &str) -> RequestBuilder {
        self.http
            .get(&self.repository.root_folder_url)
            .basic_auth(&self.user, Some(&self.password))
            .query(&[("cmisselector", selector), ("objectId", object_id)])
    }

    async fn fetch_json(&self, request: RequestBuilder, object_id: &str) -> RepoResult<Option<Value>> {
        let response = send(request.query(&[("succinct", "true")])).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response, object_id).await?;
        response
            .json()
            .await
            .map(Some)
            .map_err(|e| api_error(format!("invalid response for {}: {}", object_id, e)))
    }
}

async fn send(request: RequestBuilder) -> RepoResult<Response> {
    request.send().await.map_err(|e| {
        if e.is_connect() || e.is_timeout() {
            RepoError::BackendUnreachable(e.to_string())
        } else {
            api_error(e.to_string())
        }
    })
}

async fn check_status(response: Response, target: &str) -> RepoResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(RepoError::NotFound(target.to_string()));
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(RepoError::BackendUnreachable(format!("{}: access denied", status)));
    }
    let error_text = response.text().await.unwrap_or_default();
    Err(api_error(format!("{}: {}", status, error_text)))
}

fn api_error(message: String) -> RepoError {
    RepoError::ProviderApi {
        provider: PROVIDER.to_string(),
        message,
    }
}

fn select_repository(
    mut repositories: HashMap<String, RepositoryInfo>,
    repository_id: &str,
) -> RepoResult<RepositoryInfo> {
    if let Some(info) = repositories.remove(repository_id) {
        return Ok(info);
    }
    if let Some(info) = repositories
        .into_values()
        .find(|info| info.repository_id == repository_id)
    {
        return Ok(info);
    }
    Err(RepoError::Config(format!("CMIS repository {} not found", repository_id)))
}

fn property_str(properties: &Map<String, Value>, name: &str) -> Option<String> {
    match properties.get(name)? {
        Value::String(s) => Some(s.clone()),
        Value::Array(values) => values.first().and_then(Value::as_str).map(String::from),
        _ => None,
    }
}

fn property_u64(properties: &Map<String, Value>, name: &str) -> Option<u64> {
    match properties.get(name)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Build a [`CmisObject`] from succinct properties
fn decode_object(properties: &Map<String, Value>) -> RepoResult<CmisObject> {
    let id = property_str(properties, "cmis:objectId")
        .ok_or_else(|| api_error("object without cmis:objectId".into()))?;
    let base_type = property_str(properties, "cmis:baseTypeId")
        .map(|t| BaseTypeId::from_cmis(&t))
        .ok_or_else(|| api_error(format!("object {} without cmis:baseTypeId", id)))?;

    Ok(CmisObject {
        name: property_str(properties, "cmis:name").unwrap_or_default(),
        path: property_str(properties, "cmis:path"),
        content_stream_mime_type: property_str(properties, "cmis:contentStreamMimeType"),
        content_stream_length: property_u64(properties, "cmis:contentStreamLength"),
        id,
        base_type,
    })
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> RepoResult<T> {
    serde_json::from_value(value).map_err(|e| api_error(e.to_string()))
}

/// Full paths of an object from its parents and relative path segments
fn decode_paths(parents: Vec<ObjectParent>) -> Vec<String> {
    parents
        .into_iter()
        .filter_map(|parent| {
            let segment = parent.relative_path_segment?;
            let parent_path = property_str(&parent.object.properties, "cmis:path")?;
            Some(path::join(&parent_path, &segment))
        })
        .collect()
}

#[async_trait]
impl CmisSession for BrowserBindingSession {
    async fn get_object(&self, id: &str) -> RepoResult<Option<CmisObject>> {
        match self.fetch_json(self.request("object", id), id).await? {
            Some(value) => {
                let data: ObjectData = decode(value)?;
                decode_object(&data.properties).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn get_root_folder(&self) -> RepoResult<CmisObject> {
        let root_id = &self.repository.root_folder_id;
        self.get_object(root_id)
            .await?
            .ok_or_else(|| RepoError::NotFound(root_id.clone()))
    }

    async fn get_children(&self, folder_id: &str) -> RepoResult<Vec<CmisObject>> {
        let mut children = Vec::new();
        let mut skip = 0u32;
        loop {
            let request = self.request("children", folder_id).query(&[
                ("skipCount", skip.to_string()),
                ("maxItems", PAGE_SIZE.to_string()),
            ]);
            let value = self
                .fetch_json(request, folder_id)
                .await?
                .ok_or_else(|| RepoError::NotFound(folder_id.to_string()))?;
            let page: ChildrenPage = decode(value)?;
            let count = page.objects.len() as u32;
            for entry in page.objects {
                children.push(decode_object(&entry.object.properties)?);
            }
            if !page.has_more_items || count == 0 {
                break;
            }
            skip += count;
        }
        debug!("CMIS folder {} has {} children", folder_id, children.len());
        Ok(children)
    }

    async fn get_paths(&self, object_id: &str) -> RepoResult<Vec<String>> {
        let object = self
            .get_object(object_id)
            .await?
            .ok_or_else(|| RepoError::NotFound(object_id.to_string()))?;
        if let Some(full) = object.path {
            return Ok(vec![full]);
        }

        let request = self
            .request("parents", object_id)
            .query(&[("includeRelativePathSegment", "true")]);
        let parents: Vec<ObjectParent> = match self.fetch_json(request, object_id).await? {
            Some(value) => decode(value)?,
            None => Vec::new(),
        };
        Ok(decode_paths(parents))
    }

    async fn get_content_stream(&self, document_id: &str) -> RepoResult<Option<ContentStream>> {
        let response = send(self.request("content", document_id)).await?;
        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::NO_CONTENT => return Ok(None),
            // Documents without a stream answer with a constraint violation
            StatusCode::CONFLICT => return Ok(None),
            _ => {}
        }
        let response = check_status(response, document_id).await?;

        let mime_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let length = response.content_length();
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| RepoError::ContentUnavailable(e.to_string())));

        Ok(Some(ContentStream {
            mime_type,
            length,
            stream: Box::pin(stream),
        }))
    }
}
