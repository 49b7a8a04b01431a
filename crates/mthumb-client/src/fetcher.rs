//! Model download into a scoped local path.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::StreamExt;
use mthumb_models::{ModelFormat, ModelId};
use reqwest::header::{HeaderMap, HeaderName, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::Method;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};
use crate::http::BackendClient;

/// A model file on local disk, valid until released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedModel {
    pub model_id: ModelId,
    pub path: PathBuf,
    /// File name declared by the backend
    pub original_file_name: String,
    /// Declared file type
    pub format: ModelFormat,
    pub size_bytes: u64,
}

/// Retrieves model files from the backing store.
#[async_trait]
pub trait ModelFetcher: Send + Sync {
    /// Download `model_id` into `dest_dir`.
    ///
    /// The body is streamed to disk; partial files are removed on failure.
    async fn fetch(&self, model_id: ModelId, dest_dir: &Path) -> ClientResult<FetchedModel>;

    /// Delete a fetched model. Best-effort: never fails, missing files are fine.
    async fn release(&self, model: FetchedModel);
}

/// Remove `path`, logging anything other than not-found.
pub async fn remove_quietly(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed file"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove file"),
    }
}

/// Extract the file name from a `Content-Disposition` header value.
///
/// Prefers `filename*` (RFC 5987) over `filename`. Directory components are
/// stripped so the name can never escape the destination directory.
pub fn parse_content_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for param in split_params(value) {
        let Some((key, raw)) = param.trim().split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                // charset'lang'value
                let raw = raw.trim();
                let encoded = raw.splitn(3, '\'').nth(2).unwrap_or(raw);
                extended = Some(percent_decode(encoded));
            }
            "filename" => plain = Some(unquote(raw.trim())),
            _ => {}
        }
    }

    extended
        .or(plain)
        .and_then(|name| {
            Path::new(&name.replace('\\', "/"))
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.to_string())
        })
        .filter(|n| !n.is_empty() && n != "." && n != "..")
}

/// Split header parameters on `;`, ignoring separators inside quoted strings.
fn split_params(value: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;

    for (i, c) in value.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ';' if !quoted => {
                params.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    params.push(&value[start..]);
    params
}

fn unquote(raw: &str) -> String {
    match raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
        Some(inner) => {
            let mut out = String::with_capacity(inner.len());
            let mut chars = inner.chars();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => out.extend(chars.next()),
                    c => out.push(c),
                }
            }
            out
        }
        None => raw.to_string(),
    }
}

fn percent_decode(encoded: &str) -> String {
    match urlencoding::decode(encoded) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => String::from_utf8_lossy(&urlencoding::decode_binary(encoded.as_bytes()))
            .into_owned(),
    }
}

/// Map a model MIME type to its format.
pub fn format_from_content_type(value: &str) -> Option<ModelFormat> {
    let mime = value.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    match mime.as_str() {
        "model/obj" | "text/x-obj" => Some(ModelFormat::Obj),
        "model/gltf-binary" => Some(ModelFormat::Glb),
        "model/gltf+json" => Some(ModelFormat::Gltf),
        "application/x-fbx" | "model/vnd.fbx" => Some(ModelFormat::Fbx),
        "application/x-blender" => Some(ModelFormat::Blend),
        _ => None,
    }
}

fn header_str(headers: &HeaderMap, name: HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Resolve the declared file name and type from response headers.
fn declared_file(model_id: ModelId, headers: &HeaderMap) -> ClientResult<(String, ModelFormat)> {
    if let Some(name) = header_str(headers, CONTENT_DISPOSITION).and_then(parse_content_disposition) {
        let format = ModelFormat::from_file_name(&name).ok_or_else(|| {
            ClientError::invalid_response(format!("unsupported model file type: {}", name))
        })?;
        return Ok((name, format));
    }

    let format = header_str(headers, CONTENT_TYPE)
        .and_then(format_from_content_type)
        .ok_or_else(|| {
            ClientError::invalid_response(format!(
                "model {} response declares neither a file name nor a model content type",
                model_id
            ))
        })?;
    Ok((format!("model-{}.{}", model_id, format.extension()), format))
}

/// `ModelFetcher` over the backend REST API.
#[derive(Clone)]
pub struct HttpModelFetcher {
    client: BackendClient,
}

impl HttpModelFetcher {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    async fn stream_to_file(
        &self,
        response: reqwest::Response,
        path: &Path,
    ) -> ClientResult<u64> {
        let limit = self.client.config().max_model_bytes;
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(ClientError::TooLarge { limit });
        }

        let mut file = tokio::fs::File::create(path).await?;
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            written += chunk.len() as u64;
            if written > limit {
                return Err(ClientError::TooLarge { limit });
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        Ok(written)
    }
}

#[async_trait]
impl ModelFetcher for HttpModelFetcher {
    async fn fetch(&self, model_id: ModelId, dest_dir: &Path) -> ClientResult<FetchedModel> {
        let timeout = self.client.config().download_timeout;
        let path = format!("/models/{}/file", model_id);

        self.client
            .execute("fetch_model", async {
                let response = self
                    .client
                    .request(Method::GET, &path, timeout)
                    .send()
                    .await?;
                if !response.status().is_success() {
                    return Err(BackendClient::error_response(response).await);
                }

                let (file_name, format) = declared_file(model_id, response.headers())?;
                tokio::fs::create_dir_all(dest_dir).await?;
                let local_path = dest_dir.join(&file_name);

                let size_bytes = match self.stream_to_file(response, &local_path).await {
                    Ok(size) => size,
                    Err(e) => {
                        remove_quietly(&local_path).await;
                        return Err(e);
                    }
                };

                debug!(
                    model_id = %model_id,
                    file = %file_name,
                    bytes = size_bytes,
                    "Fetched model"
                );

                Ok(FetchedModel {
                    model_id,
                    path: local_path,
                    original_file_name: file_name,
                    format,
                    size_bytes,
                })
            })
            .await
    }

    async fn release(&self, model: FetchedModel) {
        remove_quietly(&model.path).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CUBE_OBJ: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    fn fetcher(server: &MockServer, config: BackendConfig) -> HttpModelFetcher {
        HttpModelFetcher::new(BackendClient::new(config.with_base_url(server.uri())).unwrap())
    }

    #[test]
    fn test_parse_content_disposition() {
        assert_eq!(
            parse_content_disposition("attachment; filename=\"chair.obj\""),
            Some("chair.obj".to_string())
        );
        assert_eq!(
            parse_content_disposition("attachment; filename=a.obj; filename*=UTF-8''my%20chair.glb"),
            Some("my chair.glb".to_string())
        );
        assert_eq!(
            parse_content_disposition("attachment; filename=\"../../etc/passwd\""),
            Some("passwd".to_string())
        );
        assert_eq!(parse_content_disposition("inline"), None);
    }

    #[test]
    fn test_quoted_filename_may_contain_separators() {
        assert_eq!(
            parse_content_disposition("attachment; filename=\"a;b.obj\"; size=12"),
            Some("a;b.obj".to_string())
        );
        assert_eq!(
            parse_content_disposition("attachment; filename=\"say \\\"hi\\\".obj\""),
            Some("say \"hi\".obj".to_string())
        );
    }

    #[test]
    fn test_extended_filename_decodes_utf8() {
        assert_eq!(
            parse_content_disposition("attachment; filename*=UTF-8''st%C3%BChl.fbx"),
            Some("st\u{fc}hl.fbx".to_string())
        );
    }

    #[test]
    fn test_format_from_content_type() {
        assert_eq!(
            format_from_content_type("model/gltf-binary"),
            Some(ModelFormat::Glb)
        );
        assert_eq!(
            format_from_content_type("model/obj; charset=utf-8"),
            Some(ModelFormat::Obj)
        );
        assert_eq!(format_from_content_type("application/octet-stream"), None);
    }

    #[tokio::test]
    async fn test_fetch_streams_to_disk() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models/5/file"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-disposition", "attachment; filename=\"tri.obj\"")
                    .set_body_string(CUBE_OBJ),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let fetcher = fetcher(&server, BackendConfig::default());
        let model = fetcher.fetch(ModelId(5), dir.path()).await.unwrap();

        assert_eq!(model.original_file_name, "tri.obj");
        assert_eq!(model.format, ModelFormat::Obj);
        assert_eq!(model.size_bytes, CUBE_OBJ.len() as u64);
        assert_eq!(std::fs::read_to_string(&model.path).unwrap(), CUBE_OBJ);

        let path = model.path.clone();
        fetcher.release(model.clone()).await;
        assert!(!path.exists());
        // Releasing twice is harmless.
        fetcher.release(model).await;
    }

    #[tokio::test]
    async fn test_fetch_falls_back_to_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models/8/file"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(b"glTF".to_vec(), "model/gltf-binary"),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let model = fetcher(&server, BackendConfig::default())
            .fetch(ModelId(8), dir.path())
            .await
            .unwrap();
        assert_eq!(model.original_file_name, "model-8.glb");
        assert_eq!(model.format, ModelFormat::Glb);
    }

    #[tokio::test]
    async fn test_fetch_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models/404/file"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = fetcher(&server, BackendConfig::default())
            .fetch(ModelId(404), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_oversized_download_leaves_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models/6/file"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-disposition", "attachment; filename=\"big.obj\"")
                    .set_body_string("x".repeat(64)),
            )
            .mount(&server)
            .await;

        let config = BackendConfig {
            max_model_bytes: 16,
            ..BackendConfig::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let err = fetcher(&server, config)
            .fetch(ModelId(6), dir.path())
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::TooLarge { limit: 16 }));
        assert!(!dir.path().join("big.obj").exists());
    }

    #[tokio::test]
    async fn test_unknown_file_type_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models/7/file"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-disposition", "attachment; filename=\"notes.txt\"")
                    .set_body_string("hello"),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = fetcher(&server, BackendConfig::default())
            .fetch(ModelId(7), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidResponse(_)));
    }
}
