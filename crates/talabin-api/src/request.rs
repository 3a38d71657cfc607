// ── Request description ──
//
// An `ApiRequest` is a plain value: the executor turns it into HTTP on every
// attempt, so it must be cheap to clone and replay verbatim on retry.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::Value;

/// One logical API call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Endpoint path relative to the base URL, e.g. `/wallet/balance/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// File sent as `multipart/form-data` instead of a JSON body.
    pub upload: Option<FileUpload>,
    /// Call-specific headers; override defaults with the same name.
    pub headers: BTreeMap<String, String>,
    body_error: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            upload: None,
            headers: BTreeMap::new(),
            body_error: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    ///
    /// A value that fails to serialize is remembered and reported by the
    /// executor as an `unknown` failure without sending anything.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Self {
        match serde_json::to_value(body) {
            Ok(value) => {
                self.body = Some(value);
                self.upload = None;
                self.body_error = None;
            }
            Err(e) => self.body_error = Some(e.to_string()),
        }
        self
    }

    /// Send `upload` as a multipart form, replacing any JSON body.
    pub fn multipart(mut self, upload: FileUpload) -> Self {
        self.body = None;
        self.body_error = None;
        self.upload = Some(upload);
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Add a query pair only when `value` is present.
    pub fn query_opt(self, name: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(name, value),
            None => self,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub(crate) fn body_error(&self) -> Option<&str> {
        self.body_error.as_deref()
    }
}

// ── File uploads ─────────────────────────────────────────────────────

/// One file field of a multipart upload. Held as bytes so a retried
/// request can rebuild the form.
#[derive(Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub field: String,
    pub file_name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    /// Upload under the backend's default field name, `file`.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        Self {
            field: "file".into(),
            mime: mime_for(&file_name).map(str::to_owned),
            file_name,
            bytes,
        }
    }

    /// Read `path` from disk, naming the part after the file.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map_or_else(|| "upload".into(), |n| n.to_string_lossy().into_owned());
        Ok(Self::new(file_name, bytes))
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    pub(crate) fn to_form(&self) -> Result<Form, reqwest::Error> {
        let mut part = Part::bytes(self.bytes.clone()).file_name(self.file_name.clone());
        if let Some(mime) = &self.mime {
            part = part.mime_str(mime)?;
        }
        Ok(Form::new().part(self.field.clone(), part))
    }
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("field", &self.field)
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Content types the backend accepts for receipts and KYC documents.
fn mime_for(file_name: &str) -> Option<&'static str> {
    let ext = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "pdf" => Some("application/pdf"),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("refuses to serialize"))
        }
    }

    #[test]
    fn builder_collects_parts() {
        let req = ApiRequest::post("/trading/buy/")
            .json(&json!({"amount": "1.5"}))
            .query("page", 2)
            .query_opt("type", None::<&str>)
            .header("X-Request-Id", "abc");

        assert_eq!(req.method, Method::POST);
        assert_eq!(req.path, "/trading/buy/");
        assert_eq!(req.body, Some(json!({"amount": "1.5"})));
        assert_eq!(req.query, vec![("page".to_owned(), "2".to_owned())]);
        assert_eq!(req.headers.get("X-Request-Id").map(String::as_str), Some("abc"));
        assert!(req.body_error().is_none());
    }

    #[test]
    fn multipart_replaces_json_body() {
        let upload = FileUpload::new("Receipt.JPG", vec![1, 2, 3]).with_field("receipt_image");
        let req = ApiRequest::post("/wallet/deposits/4/upload_receipt/")
            .json(&json!({"amount": "1"}))
            .multipart(upload);

        assert!(req.body.is_none());
        let upload = req.upload.unwrap();
        assert_eq!(upload.field, "receipt_image");
        assert_eq!(upload.mime.as_deref(), Some("image/jpeg"));
        assert!(format!("{upload:?}").contains("len: 3"));
    }

    #[test]
    fn unknown_extension_has_no_mime() {
        assert_eq!(FileUpload::new("scan.tiff", Vec::new()).mime, None);
        assert!(FileUpload::new("x.bin", Vec::new())
            .with_mime("not a mime")
            .to_form()
            .is_err());
    }

    #[test]
    fn serialization_failure_is_remembered() {
        let req = ApiRequest::post("/x/").json(&Unserializable);
        assert!(req.body.is_none());
        assert_eq!(req.body_error(), Some("refuses to serialize"));
    }
}
