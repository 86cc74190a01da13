//! Client for the remote background removal service
//!
//! The service contract is a single multipart POST carrying the image and the
//! editing parameters; a 2xx response body is the processed image. Anything
//! else is a [`StudioError::RemoteFailure`].

use crate::config::{Background, EditingParams, StudioConfig};
use crate::error::{Result, StudioError};
use crate::tracing_config::spans;
use crate::types::{ImageRecord, PreviewRef};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::sync::Arc;
use tracing::Instrument;

/// Value of one multipart field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    File {
        file_name: String,
        mime: Option<String>,
        bytes: Arc<Vec<u8>>,
    },
}

/// One named multipart field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: &'static str,
    pub value: FieldValue,
}

impl FormField {
    fn text(name: &'static str, value: impl ToString) -> Self {
        Self {
            name,
            value: FieldValue::Text(value.to_string()),
        }
    }

    /// Text content, if this is a text field
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            FieldValue::Text(text) => Some(text),
            FieldValue::File { .. } => None,
        }
    }
}

/// A prepared removal request for one record
///
/// Built from the record's source and a parameter snapshot, so later
/// parameter changes never leak into a request that is already prepared.
#[derive(Debug, Clone)]
pub struct RemovalRequest {
    file_name: String,
    mime: Option<String>,
    bytes: Arc<Vec<u8>>,
    params: EditingParams,
}

impl RemovalRequest {
    #[must_use]
    pub fn new(record: &ImageRecord, params: &EditingParams) -> Self {
        let source = record.source();
        Self {
            file_name: source.name().to_string(),
            mime: source.image_mime(),
            bytes: source.shared_bytes(),
            params: params.clone(),
        }
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    #[must_use]
    pub fn params(&self) -> &EditingParams {
        &self.params
    }

    /// Multipart fields in the order they are sent
    #[must_use]
    pub fn form_fields(&self) -> Vec<FormField> {
        let mut fields = vec![FormField {
            name: "file",
            value: FieldValue::File {
                file_name: self.file_name.clone(),
                mime: self.mime.clone(),
                bytes: Arc::clone(&self.bytes),
            },
        }];

        let background = &self.params.background;
        fields.push(FormField::text("background_type", background.kind()));
        fields.push(FormField::text("background_value", background.value()));

        match background {
            Background::Color { .. } | Background::Gradient { .. } => {},
            Background::Image { name, bytes } => {
                if bytes.is_empty() {
                    log::warn!("Custom background {} has no content, sending name only", name);
                } else {
                    fields.push(FormField {
                        name: "custom_background_image",
                        value: FieldValue::File {
                            file_name: name.clone(),
                            mime: crate::services::ImageIOService::detect_image_mime(
                                name, None, bytes,
                            ),
                            bytes: Arc::clone(bytes),
                        },
                    });
                }
            },
        }

        let shadow = &self.params.shadow;
        fields.push(FormField::text("shadow_blur", shadow.blur));
        fields.push(FormField::text("shadow_offset_x", shadow.offset_x));
        fields.push(FormField::text("shadow_offset_y", shadow.offset_y));
        fields.push(FormField::text("shadow_color", &shadow.color));

        let adjustments = &self.params.adjustments;
        fields.push(FormField::text("brightness", adjustments.brightness));
        fields.push(FormField::text("contrast", adjustments.contrast));
        fields.push(FormField::text("saturation", adjustments.saturation));

        fields
    }

    fn into_form(self) -> Result<Form> {
        self.form_fields()
            .into_iter()
            .try_fold(Form::new(), |form, field| match field.value {
                FieldValue::Text(text) => Ok(form.text(field.name, text)),
                FieldValue::File {
                    file_name,
                    mime,
                    bytes,
                } => {
                    let part = Part::bytes((*bytes).clone()).file_name(file_name);
                    let part = match mime {
                        Some(mime) => part.mime_str(&mime).map_err(|e| {
                            StudioError::remote(format!("Invalid content type '{}': {}", mime, e))
                        })?,
                        None => part,
                    };
                    Ok(form.part(field.name, part))
                },
            })
    }
}

/// Remote background removal service
#[async_trait]
pub trait RemovalClient: Send + Sync {
    /// Send one request and return the processed image
    ///
    /// # Errors
    /// - `RemoteFailure` for transport errors and non-success responses
    async fn remove_background(&self, request: RemovalRequest) -> Result<PreviewRef>;

    /// Endpoint description used in logs
    fn endpoint(&self) -> &str;
}

/// HTTP implementation of [`RemovalClient`] backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpRemovalClient {
    client: Client,
    endpoint: String,
}

impl HttpRemovalClient {
    /// Create a client for the configured endpoint
    ///
    /// # Errors
    /// - Invalid endpoint or timeout in `config`
    /// - HTTP client cannot be constructed
    pub fn new(config: &StudioConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| {
            StudioError::invalid_config(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl RemovalClient for HttpRemovalClient {
    async fn remove_background(&self, request: RemovalRequest) -> Result<PreviewRef> {
        let span = spans::remote_call(request.file_name(), &self.endpoint);

        async move {
            let file_name = request.file_name().to_string();
            let form = request.into_form()?;

            let response = self
                .client
                .post(&self.endpoint)
                .multipart(form)
                .send()
                .await
                .map_err(|e| StudioError::remote_transport(&self.endpoint, &e))?;

            let status = response.status();
            if !status.is_success() {
                tracing::warn!(file = %file_name, status = %status, "Removal service rejected request");
                return Err(StudioError::remote_status(status, &self.endpoint));
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| StudioError::remote_transport(&self.endpoint, &e))?;

            if bytes.is_empty() {
                return Err(StudioError::remote(format!(
                    "Empty response from {} for {}",
                    self.endpoint, file_name
                )));
            }

            tracing::debug!(file = %file_name, bytes = bytes.len(), "Received processed image");
            Ok(PreviewRef::from_response(bytes.to_vec()))
        }
        .instrument(span)
        .await
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
