//! Resource payload upload.

use futures::stream;
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{error, info, warn};

use crate::client::CkanClient;
use crate::error::{Error, Result};
use crate::migrate::datasets::StagedResource;
use crate::model::{ResourceForm, ResourceOutcome};

const CREATE_ACTION: &str = "resource_create";

/// Size of each read from a staged payload during upload.
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Uploads staged resource payloads to the target catalog.
pub struct ResourceMigrator<'a> {
    target: &'a CkanClient,
}

impl<'a> ResourceMigrator<'a> {
    /// Creates an uploader for the target client.
    pub fn new(target: &'a CkanClient) -> Self {
        Self { target }
    }

    /// Uploads one staged resource into the target dataset.
    ///
    /// A 404 from the multipart endpoint triggers one JSON creation with
    /// only the dataset id, name and URL; its success is reported as
    /// [`ResourceOutcome::Placeholder`].
    pub async fn migrate(&self, dataset_id: &str, resource: &StagedResource) -> ResourceOutcome {
        let payload = match staged_part(&resource.path).await {
            Ok(part) => part,
            Err(e) => {
                error!("  {}", e);
                return ResourceOutcome::Failed(e.to_string());
            }
        };

        info!("  Uploading resource: {}", resource.descriptor.id);

        let fields = resource.descriptor.upload_form(dataset_id);
        let form = multipart_form(&fields, payload);

        let response = match self.target.post_multipart(CREATE_ACTION, form).await {
            Ok(response) => response,
            Err(e) => {
                error!("  Error uploading resource: {}", e);
                return ResourceOutcome::Failed(e.to_string());
            }
        };

        match response.status {
            200 => match response.action() {
                Some(action) if action.success => {
                    info!("  Resource uploaded successfully");
                    ResourceOutcome::Uploaded
                }
                Some(action) => {
                    let reason = action.error_message();
                    error!("  Failed to upload resource: {}", reason);
                    ResourceOutcome::Failed(reason)
                }
                None => {
                    error!("  Error parsing upload response");
                    ResourceOutcome::Failed("unreadable upload response".to_string())
                }
            },
            404 => {
                error!("  Failed to upload resource: HTTP 404");
                warn!("  Upload endpoint not found, creating resource without payload");
                self.create_placeholder(&fields).await
            }
            status => {
                error!("  Failed to upload resource: HTTP {}", status);
                ResourceOutcome::Failed(format!("HTTP {status}"))
            }
        }
    }

    async fn create_placeholder(&self, fields: &ResourceForm) -> ResourceOutcome {
        match self.target.post_once(CREATE_ACTION, &fields.fallback()).await {
            Ok(response) if response.is_action_success() => {
                info!("  Successfully created resource placeholder");
                ResourceOutcome::Placeholder
            }
            Ok(response) => {
                error!("  Placeholder creation failed: HTTP {}", response.status);
                ResourceOutcome::Failed(format!("fallback HTTP {}", response.status))
            }
            Err(e) => {
                error!("  Placeholder creation failed: {}", e);
                ResourceOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Opens the staged payload as a streamed upload part.
///
/// The file handle lives inside the stream and is dropped with the request
/// body, whatever the outcome of the upload.
async fn staged_part(path: &Path) -> Result<Part> {
    if !path.is_file() {
        return Err(Error::Staging(format!(
            "Resource file not found: {}",
            path.display()
        )));
    }
    let file = File::open(path).await?;
    let length = file.metadata().await?.len();

    let chunks = stream::unfold(file, |mut file| async move {
        let mut buf = vec![0u8; UPLOAD_CHUNK_SIZE];
        match file.read(&mut buf).await {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                Some((Ok::<_, std::io::Error>(buf), file))
            }
            Err(e) => Some((Err(e), file)),
        }
    });

    Ok(Part::stream_with_length(Body::wrap_stream(chunks), length)
        .file_name(upload_file_name(path)))
}

fn upload_file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string())
}

fn multipart_form(fields: &ResourceForm, payload: Part) -> Form {
    let form = fields
        .fields()
        .into_iter()
        .fold(Form::new(), |form, (key, value)| form.text(key, value));
    form.part("upload", payload)
}
