use std::collections::HashMap;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Form,
};
use file_format::FileFormat;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ApiError;

/// Image formats recognised from file content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    Bmp,
    Webp,
}

impl ImageKind {
    /// Detects the format from the file content.
    pub fn sniff(body: &[u8]) -> Option<Self> {
        match FileFormat::from_bytes(body) {
            FileFormat::JointPhotographicExpertsGroup => Some(Self::Jpeg),
            FileFormat::PortableNetworkGraphics => Some(Self::Png),
            FileFormat::GraphicsInterchangeFormat => Some(Self::Gif),
            FileFormat::WindowsBitmap => Some(Self::Bmp),
            FileFormat::Webp => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Webp => "webp",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::Webp => "image/webp",
        }
    }

    /// Whether an entry of a `mimes:` list names this format.
    pub fn matches(self, ext: &str) -> bool {
        match self {
            Self::Jpeg => matches!(ext, "jpeg" | "jpg" | "jpe"),
            other => other.extension() == ext,
        }
    }
}

/// A file part of a multipart request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl UploadedFile {
    pub fn kind(&self) -> Option<ImageKind> {
        ImageKind::sniff(&self.body)
    }

    pub fn size_kib(&self) -> f64 {
        self.body.len() as f64 / 1024.0
    }
}

/// Fields passed through untouched; every other top-level string is trimmed.
const UNTRIMMED: &[&str] = &["password", "password_confirmation", "current_password"];

fn normalise(field: &str, value: Value) -> Value {
    match value {
        Value::String(s) if !UNTRIMMED.contains(&field) => {
            let trimmed = s.trim();
            if trimmed.len() == s.len() {
                Value::String(s)
            } else {
                Value::String(trimmed.to_string())
            }
        }
        other => other,
    }
}

/// Request input gathered from a JSON, urlencoded or multipart body.
#[derive(Debug, Clone, Default)]
pub struct Payload {
    fields: Map<String, Value>,
    files: HashMap<String, UploadedFile>,
}

impl Payload {
    pub fn from_json(value: Value) -> Self {
        let fields = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::from_fields(fields)
    }

    fn from_fields(fields: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            fields: fields
                .into_iter()
                .map(|(k, v)| {
                    let v = normalise(&k, v);
                    (k, v)
                })
                .collect(),
            files: HashMap::new(),
        }
    }

    pub fn with_file(mut self, name: &str, file: UploadedFile) -> Self {
        self.files.insert(name.to_string(), file);
        self
    }

    pub fn value(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// String value of `field`; other JSON types yield `None`.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    /// Integer value of `field`, accepting numbers and numeric strings.
    pub fn id(&self, field: &str) -> Option<i64> {
        match self.fields.get(field)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn file(&self, field: &str) -> Option<&UploadedFile> {
        self.files.get(field)
    }

    pub fn take_file(&mut self, field: &str) -> Option<UploadedFile> {
        self.files.remove(field)
    }
}

#[async_trait]
impl<S> FromRequest<S> for Payload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let mut mp = Multipart::from_request(req, state).await.map_err(|e| {
                warn!(error = %e, "multipart rejected");
                ApiError::MalformedBody("Malformed multipart body.")
            })?;
            let mut payload = Payload::default();
            while let Some(field) = mp.next_field().await.map_err(|e| {
                warn!(error = %e, "multipart field unreadable");
                ApiError::MalformedBody("Malformed multipart body.")
            })? {
                let Some(name) = field.name().map(str::to_string) else {
                    continue;
                };
                if let Some(file_name) = field.file_name().map(str::to_string) {
                    let content_type = field.content_type().map(str::to_string);
                    let body = field.bytes().await.map_err(|e| {
                        warn!(error = %e, field = %name, "multipart file unreadable");
                        ApiError::MalformedBody("Malformed multipart body.")
                    })?;
                    // browsers send an empty part when no file was chosen
                    if body.is_empty() && file_name.is_empty() {
                        continue;
                    }
                    payload.files.insert(
                        name,
                        UploadedFile {
                            file_name: Some(file_name),
                            content_type,
                            body,
                        },
                    );
                } else {
                    let text = field.text().await.map_err(|e| {
                        warn!(error = %e, field = %name, "multipart text unreadable");
                        ApiError::MalformedBody("Malformed multipart body.")
                    })?;
                    let value = normalise(&name, Value::String(text));
                    payload.fields.insert(name, value);
                }
            }
            debug!(
                fields = payload.fields.len(),
                files = payload.files.len(),
                "multipart payload"
            );
            return Ok(payload);
        }

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(form) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| {
                    warn!(error = %e, "form rejected");
                    ApiError::MalformedBody("Malformed form body.")
                })?;
            return Ok(Payload::from_fields(
                form.into_iter().map(|(k, v)| (k, Value::String(v))),
            ));
        }

        let body = Bytes::from_request(req, state).await.map_err(|e| {
            warn!(error = %e, "body unreadable");
            ApiError::MalformedBody("Malformed request body.")
        })?;
        if body.is_empty() {
            return Ok(Payload::default());
        }
        match serde_json::from_slice::<Value>(&body) {
            Ok(value) => Ok(Payload::from_json(value)),
            Err(e) => {
                // treated as empty input so the rule table reports what is missing
                warn!(error = %e, "json body unparsable");
                Ok(Payload::default())
            }
        }
    }
}
