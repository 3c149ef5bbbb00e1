use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use super::{ApiUsage, Commit, FileContent, FileOperation, RemoteError, Repository};
use crate::config::RemoteConfig;

/// Base64 of the UTF-8 bytes of `content`
pub fn encode_content(content: &str) -> String {
    STANDARD.encode(content.as_bytes())
}

/// Inverse of [`encode_content`]; tolerates the line breaks the API wraps
/// long payloads with
pub fn decode_content(encoded: &str) -> Result<String, RemoteError> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| RemoteError::Decode(format!("invalid base64 content: {e}")))?;
    String::from_utf8(bytes).map_err(|e| RemoteError::Decode(format!("content is not UTF-8: {e}")))
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct WriteResponse {
    content: FileContent,
}

#[derive(Serialize)]
struct WriteBody<'a> {
    content: String,
    message: &'a str,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Serialize)]
struct DeleteBody<'a> {
    message: &'a str,
    sha: &'a str,
    branch: &'a str,
}

/// Thin async client over the contents, commits and repository endpoints
pub struct FileStoreClient {
    http: reqwest::Client,
    base_url: String,
    owner: String,
    repo: String,
    branch: String,
    token: Option<String>,
    batch_delay: Duration,
}

impl FileStoreClient {
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        if !config.is_configured() {
            return Err(RemoteError::NotConfigured);
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("navdir/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(RemoteError::Network)?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            branch: config.branch.clone(),
            token: config.resolve_token(),
            batch_delay: Duration::from_millis(config.batch_delay_ms),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    fn repo_url(&self) -> String {
        format!("{}/repos/{}/{}", self.base_url, self.owner, self.repo)
    }

    fn contents_url(&self, path: &str) -> String {
        let encoded: Vec<String> = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/contents/{}", self.repo_url(), encoded.join("/"))
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.header(reqwest::header::AUTHORIZATION, format!("token {token}")),
            None => builder,
        }
    }

    /// Send and turn any non-success status into a [`RemoteError`]
    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        label: &str,
    ) -> Result<reqwest::Response, RemoteError> {
        tracing::debug!("{}", label);
        let resp = builder.send().await.map_err(RemoteError::Network)?;
        let status = resp.status();
        tracing::debug!(status = status.as_u16(), "{}", label);
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message);
        let path = label.split_once(' ').map_or(label, |(_, path)| path);
        Err(RemoteError::from_status(status.as_u16(), path, message))
    }

    pub async fn get_repository(&self) -> Result<Repository, RemoteError> {
        let url = self.repo_url();
        let resp = self
            .send(self.request(Method::GET, &url), &format!("GET {}/{}", self.owner, self.repo))
            .await?;
        Ok(resp.json().await?)
    }

    /// Metadata and base64 content of one file, on `ref_` or the configured branch
    pub async fn get_file(&self, path: &str, ref_: Option<&str>) -> Result<FileContent, RemoteError> {
        let builder = self
            .request(Method::GET, &self.contents_url(path))
            .query(&[("ref", ref_.unwrap_or(&self.branch))]);
        let resp = self.send(builder, &format!("GET {path}")).await?;
        Ok(resp.json().await?)
    }

    pub async fn get_directory(
        &self,
        path: &str,
        ref_: Option<&str>,
    ) -> Result<Vec<FileContent>, RemoteError> {
        let builder = self
            .request(Method::GET, &self.contents_url(path))
            .query(&[("ref", ref_.unwrap_or(&self.branch))]);
        let resp = self.send(builder, &format!("GET {path}")).await?;
        Ok(resp.json().await?)
    }

    pub async fn create_file(&self, op: &FileOperation) -> Result<FileContent, RemoteError> {
        let body = WriteBody {
            content: encode_content(&op.content),
            message: &op.message,
            branch: op.branch.as_deref().unwrap_or(&self.branch),
            sha: None,
        };
        let builder = self
            .request(Method::POST, &self.contents_url(&op.path))
            .json(&body);
        let resp = self.send(builder, &format!("POST {}", op.path)).await?;
        let written: WriteResponse = resp.json().await?;
        Ok(written.content)
    }

    pub async fn update_file(&self, op: &FileOperation) -> Result<FileContent, RemoteError> {
        let sha = op
            .sha
            .as_deref()
            .ok_or_else(|| RemoteError::MissingSha(op.path.clone()))?;
        let body = WriteBody {
            content: encode_content(&op.content),
            message: &op.message,
            branch: op.branch.as_deref().unwrap_or(&self.branch),
            sha: Some(sha),
        };
        let builder = self
            .request(Method::PUT, &self.contents_url(&op.path))
            .json(&body);
        let resp = self.send(builder, &format!("PUT {}", op.path)).await?;
        let written: WriteResponse = resp.json().await?;
        Ok(written.content)
    }

    pub async fn delete_file(&self, path: &str, sha: &str, message: &str) -> Result<(), RemoteError> {
        let body = DeleteBody {
            message,
            sha,
            branch: &self.branch,
        };
        let builder = self
            .request(Method::DELETE, &self.contents_url(path))
            .json(&body);
        self.send(builder, &format!("DELETE {path}")).await?;
        Ok(())
    }

    /// Delete a file by path, looking up its current sha first
    pub async fn delete_path(&self, path: &str, message: &str) -> Result<(), RemoteError> {
        let existing = self.get_file(path, None).await?;
        self.delete_file(path, &existing.sha, message).await
    }

    /// Update when the file exists (using its current sha), create otherwise
    pub async fn create_or_update_file(&self, op: &FileOperation) -> Result<FileContent, RemoteError> {
        match self.get_file(&op.path, op.branch.as_deref()).await {
            Ok(existing) => {
                let op = FileOperation {
                    sha: Some(existing.sha),
                    ..op.clone()
                };
                self.update_file(&op).await
            }
            Err(e) if e.is_not_found() => self.create_file(op).await,
            Err(e) => Err(e),
        }
    }

    /// Apply each operation in order with the configured pause between
    /// calls; stops at the first failure
    pub async fn batch(&self, ops: &[FileOperation]) -> Result<Vec<FileContent>, RemoteError> {
        let mut results = Vec::with_capacity(ops.len());
        for (i, op) in ops.iter().enumerate() {
            match self.create_or_update_file(op).await {
                Ok(content) => results.push(content),
                Err(e) => {
                    tracing::warn!(path = %op.path, "Batch operation failed: {}", e);
                    return Err(e);
                }
            }
            tracing::info!("Synced {} ({}/{})", op.path, i + 1, ops.len());
            tokio::time::sleep(self.batch_delay).await;
        }
        Ok(results)
    }

    pub async fn commits(&self, path: Option<&str>, limit: usize) -> Result<Vec<Commit>, RemoteError> {
        let mut params = vec![
            ("sha", self.branch.clone()),
            ("per_page", limit.to_string()),
        ];
        if let Some(path) = path {
            params.push(("path", path.to_string()));
        }
        let url = format!("{}/commits", self.repo_url());
        let builder = self.request(Method::GET, &url).query(&params);
        let resp = self.send(builder, "GET commits").await?;
        Ok(resp.json().await?)
    }

    pub async fn commit(&self, sha: &str) -> Result<Commit, RemoteError> {
        let url = format!("{}/commits/{}", self.repo_url(), urlencoding::encode(sha));
        let resp = self
            .send(self.request(Method::GET, &url), &format!("GET commits/{sha}"))
            .await?;
        Ok(resp.json().await?)
    }

    pub async fn file_exists(&self, path: &str) -> Result<bool, RemoteError> {
        match self.get_file(path, None).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Decoded text of a file
    pub async fn raw_content(&self, path: &str) -> Result<String, RemoteError> {
        let file = self.get_file(path, None).await?;
        decode_content(file.content.as_deref().unwrap_or_default())
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RemoteError> {
        let content = self.raw_content(path).await?;
        serde_json::from_str(&content)
            .map_err(|e| RemoteError::Decode(format!("{path} is not valid JSON: {e}")))
    }

    /// Write `data` as pretty JSON, creating or replacing the file
    pub async fn save_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        data: &T,
        message: &str,
    ) -> Result<FileContent, RemoteError> {
        let content = serde_json::to_string_pretty(data)
            .map_err(|e| RemoteError::Decode(format!("cannot serialize {path}: {e}")))?;
        self.create_or_update_file(&FileOperation::new(path, content, message))
            .await
    }

    /// Copy `path` to `backup_path`, or to `{path}.backup.{millis}` when none is given
    pub async fn backup_file(
        &self,
        path: &str,
        backup_path: Option<&str>,
    ) -> Result<FileContent, RemoteError> {
        let content = self.raw_content(path).await?;
        let target = backup_path.map_or_else(
            || format!("{path}.backup.{}", chrono::Utc::now().timestamp_millis()),
            str::to_string,
        );
        self.create_file(&FileOperation::new(
            target,
            content,
            format!("Backup {path}"),
        ))
        .await
    }

    pub async fn restore_file(
        &self,
        backup_path: &str,
        target_path: &str,
    ) -> Result<FileContent, RemoteError> {
        let content = self.raw_content(backup_path).await?;
        self.create_or_update_file(&FileOperation::new(
            target_path,
            content,
            format!("Restore {target_path} from {backup_path}"),
        ))
        .await
    }

    /// Push each `file name -> JSON` entry to `{base_path}/{file name}`
    pub async fn sync_to_remote(
        &self,
        files: &BTreeMap<String, serde_json::Value>,
        base_path: &str,
    ) -> Result<Vec<FileContent>, RemoteError> {
        let mut ops = Vec::with_capacity(files.len());
        for (name, data) in files {
            let content = serde_json::to_string_pretty(data)
                .map_err(|e| RemoteError::Decode(format!("cannot serialize {name}: {e}")))?;
            ops.push(FileOperation::new(
                format!("{}/{name}", base_path.trim_end_matches('/')),
                content,
                format!("Sync {name}"),
            ));
        }
        self.batch(&ops).await
    }

    /// Fetch every `.json` file directly under `base_path`.
    ///
    /// A file that cannot be read or parsed is logged and left out.
    pub async fn sync_from_remote(
        &self,
        base_path: &str,
    ) -> Result<BTreeMap<String, serde_json::Value>, RemoteError> {
        let entries = self.get_directory(base_path, None).await?;
        let mut files = BTreeMap::new();
        for entry in entries {
            if !entry.is_file() || !entry.name.ends_with(".json") {
                continue;
            }
            match self.get_json::<serde_json::Value>(&entry.path).await {
                Ok(value) => {
                    files.insert(entry.name, value);
                }
                Err(e) => tracing::warn!(path = %entry.path, "Skipping remote file: {}", e),
            }
        }
        Ok(files)
    }

    /// Rate-limit counters from `GET /user`; zeros when unavailable
    pub async fn api_usage(&self) -> ApiUsage {
        let url = format!("{}/user", self.base_url);
        let Ok(resp) = self.send(self.request(Method::GET, &url), "GET user").await else {
            return ApiUsage::default();
        };
        let header = |name: &str| {
            resp.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(0)
        };
        ApiUsage {
            remaining: header("x-ratelimit-remaining"),
            limit: header("x-ratelimit-limit"),
            reset: header("x-ratelimit-reset"),
        }
    }
}
