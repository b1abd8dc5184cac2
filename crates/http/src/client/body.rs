//! Request options and replayable request bodies
//!
//! A request may be sent twice (original plus one retry after a token
//! refresh), so bodies are kept in a form that can rebuild the wire payload
//! for every attempt. `reqwest::multipart::Form` is consumed on send, hence
//! [`MultipartForm`].

use super::ClientError;
use campuskart_core::FileUpload;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde_json::Value;

/// Text fields plus file parts of a multipart upload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipartForm {
    fields: Vec<(String, String)>,
    files: Vec<(String, FileUpload)>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten a serializable struct into text fields.
    ///
    /// Null values are skipped; strings are sent verbatim and other scalars
    /// in their JSON rendering. Nested objects and arrays are rejected.
    pub fn from_fields<T: Serialize>(fields: &T) -> Result<Self, ClientError> {
        let Value::Object(map) = serde_json::to_value(fields)? else {
            return Err(ClientError::Configuration(
                "multipart fields must serialize to an object".into(),
            ));
        };

        let mut form = Self::new();
        for (name, value) in map {
            match value {
                Value::Null => {}
                Value::String(s) => form = form.text(name, s),
                Value::Bool(_) | Value::Number(_) => form = form.text(name, value.to_string()),
                Value::Array(_) | Value::Object(_) => {
                    return Err(ClientError::Configuration(format!(
                        "multipart field `{name}` must be a scalar"
                    )));
                }
            }
        }
        Ok(form)
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn file(mut self, name: impl Into<String>, upload: FileUpload) -> Self {
        self.files.push((name.into(), upload));
        self
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn files(&self) -> &[(String, FileUpload)] {
        &self.files
    }

    fn to_form(&self) -> Result<Form, ClientError> {
        let mut form = Form::new();
        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }
        for (name, upload) in &self.files {
            let mut part = Part::bytes(upload.bytes.clone()).file_name(upload.file_name.clone());
            if let Some(content_type) = &upload.content_type {
                part = part.mime_str(content_type)?;
            }
            form = form.part(name.clone(), part);
        }
        Ok(form)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(MultipartForm),
}

impl RequestBody {
    pub fn json<T: Serialize>(body: &T) -> Result<Self, ClientError> {
        Ok(Self::Json(serde_json::to_value(body)?))
    }

    /// JSON when no file is attached, multipart otherwise
    pub fn with_files<'a, T, I>(fields: &T, files: I) -> Result<Self, ClientError>
    where
        T: Serialize,
        I: IntoIterator<Item = (&'a str, Option<&'a FileUpload>)>,
    {
        let files: Vec<_> = files
            .into_iter()
            .filter_map(|(name, upload)| upload.map(|u| (name, u)))
            .collect();

        if files.is_empty() {
            return Self::json(fields);
        }
        Self::multipart(fields, files.into_iter().map(|(name, u)| (name, Some(u))))
    }

    /// Always multipart, for endpoints that only accept form uploads
    pub fn multipart<'a, T, I>(fields: &T, files: I) -> Result<Self, ClientError>
    where
        T: Serialize,
        I: IntoIterator<Item = (&'a str, Option<&'a FileUpload>)>,
    {
        let mut form = MultipartForm::from_fields(fields)?;
        for (name, upload) in files {
            if let Some(upload) = upload {
                form = form.file(name, upload.clone());
            }
        }
        Ok(Self::Multipart(form))
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self, Self::Multipart(_))
    }
}

/// Everything about a call except its path and auth requirement
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: RequestBody,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            body: RequestBody::Empty,
            query: Vec::new(),
            headers: HeaderMap::new(),
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post(body: RequestBody) -> Self {
        Self::new(Method::POST).body(body)
    }

    pub fn patch(body: RequestBody) -> Self {
        Self::new(Method::PATCH).body(body)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Apply query, headers and a freshly built body to `builder`
    pub(crate) fn apply(&self, mut builder: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        if !self.query.is_empty() {
            builder = builder.query(&self.query);
        }
        builder = builder.headers(self.headers.clone());

        builder = match &self.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(form) => builder.multipart(form.to_form()?),
        };
        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Listing {
        title: String,
        price: f64,
        negotiable: bool,
        category: Option<String>,
    }

    fn listing() -> Listing {
        Listing {
            title: "Desk lamp".into(),
            price: 450.5,
            negotiable: true,
            category: None,
        }
    }

    #[test]
    fn test_with_files_without_upload_is_json() {
        let body = RequestBody::with_files(&listing(), [("image", None)]).unwrap();
        assert_eq!(
            body,
            RequestBody::Json(json!({
                "title": "Desk lamp",
                "price": 450.5,
                "negotiable": true,
                "category": null
            }))
        );
    }

    #[test]
    fn test_with_files_with_upload_is_multipart() {
        let upload = FileUpload::new("lamp.jpg", vec![0xff, 0xd8]).with_content_type("image/jpeg");
        let body = RequestBody::with_files(&listing(), [("image", Some(&upload))]).unwrap();

        let RequestBody::Multipart(form) = body else {
            panic!("expected multipart body");
        };
        let mut fields = form.fields().to_vec();
        fields.sort();
        assert_eq!(
            fields,
            vec![
                ("negotiable".to_string(), "true".to_string()),
                ("price".to_string(), "450.5".to_string()),
                ("title".to_string(), "Desk lamp".to_string()),
            ]
        );
        assert_eq!(form.files().len(), 1);
        assert_eq!(form.files()[0].0, "image");
    }

    #[test]
    fn test_multipart_rejects_nested_values() {
        let result = MultipartForm::from_fields(&json!({"tags": ["a", "b"]}));
        assert!(matches!(result, Err(ClientError::Configuration(_))));
    }
}
