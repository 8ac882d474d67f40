//! Device transport interface.
//!
//! [`DeviceClient`] is the seam between the reconciliation engine and
//! the device's XML API. The engine treats the client as opaque and
//! reentrant: one shared client per provider instance multiplexes
//! concurrent resource handlers, and cancellation is cooperative —
//! dropping a handler future abandons the in-flight HTTP call.
//!
//! [`PanClient`] is the production implementation; tests substitute
//! in-memory fakes.

mod local;
mod pan;

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

use crate::version::ApiVersion;
use crate::xmlapi::{BatchOp, Element, XmlError};

pub use local::{LocalConfig, LocalConfigError};
pub use pan::{Credentials, PanClient, PanClientConfig};

/// Errors surfaced by device transport and the CRUD layers above it.
///
/// Device messages are preserved verbatim; nothing here retries — retry
/// semantics belong to the orchestrator host.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeviceError {
    /// The requested object does not exist at the location.
    ///
    /// During Read the caller removes the resource from state; during
    /// Delete it is tolerated; during Update it is surfaced.
    #[error("object not found")]
    ObjectNotFound,

    /// An object with the name already exists (create), or the target
    /// name is taken (rename).
    #[error("object '{name}' already exists")]
    Conflict {
        /// The conflicting entry name.
        name: String,
    },

    /// The device rejected the request; its message is kept verbatim.
    #[error("device error{}: {message}", code_suffix(.code))]
    Api {
        /// Device error code, when reported.
        code: Option<String>,
        /// The device's message text.
        message: String,
    },

    /// The HTTP layer failed before a device response was produced.
    #[error("transport error: {0}")]
    Transport(String),

    /// A device response could not be parsed.
    #[error("response parse error: {0}")]
    Xml(#[from] XmlError),

    /// An asynchronous device job finished unsuccessfully.
    #[error("job {job} failed: {message}")]
    JobFailure {
        /// The device job id.
        job: u64,
        /// The device's result text.
        message: String,
    },
}

fn code_suffix(code: &Option<String>) -> String {
    match code {
        Some(code) => format!(" ({code})"),
        None => String::new(),
    }
}

impl From<reqwest::Error> for DeviceError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.to_string())
    }
}

/// File category of an import upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportCategory {
    /// A certificate body.
    Certificate,
    /// A private key, always uploaded with a non-empty passphrase.
    PrivateKey,
}

impl ImportCategory {
    /// The `category` URL parameter value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Certificate => "certificate",
            Self::PrivateKey => "private-key",
        }
    }
}

/// One file-import upload.
#[derive(Debug, Clone)]
pub struct ImportRequest {
    /// File category.
    pub category: ImportCategory,
    /// Payload format (`pem`, `pkcs12`), when the device needs it spelled
    /// out.
    pub format: Option<String>,
    /// The certificate object name the payload attaches to.
    pub certificate_name: String,
    /// Decryption passphrase passed alongside the payload.
    pub passphrase: Option<SecretString>,
    /// Target template (or template stack) for template-scoped locations.
    pub target_tpl: Option<String>,
    /// Target vsys inside the template.
    pub target_tpl_vsys: Option<String>,
    /// Upload file name.
    pub file_name: String,
    /// Raw file content.
    pub content: Vec<u8>,
}

/// The device transport: XML API operations over HTTP(S).
///
/// Implementations must be safe to share across concurrent handlers.
#[async_trait]
pub trait DeviceClient: Send + Sync {
    /// The device software version negotiated at configure time.
    fn version(&self) -> ApiVersion;

    /// The quote character used when building xpath predicates.
    fn filter_quote(&self) -> char {
        '\''
    }

    /// Reads candidate configuration at an xpath.
    ///
    /// Returns the `<result>` element. An absent node maps to
    /// [`DeviceError::ObjectNotFound`].
    async fn get_config(&self, xpath: &str) -> Result<Element, DeviceError>;

    /// Reads running configuration at an xpath.
    async fn show_config(&self, xpath: &str) -> Result<Element, DeviceError>;

    /// Upserts an element at a fully qualified xpath.
    async fn edit_config(&self, xpath: &str, element: &Element) -> Result<(), DeviceError>;

    /// Renames the entry at the xpath in place.
    async fn rename(&self, xpath: &str, new_name: &str) -> Result<(), DeviceError>;

    /// Deletes the node at the xpath. Absence is not an error.
    async fn delete(&self, xpath: &str) -> Result<(), DeviceError>;

    /// Applies a batch of operations atomically, in declared order.
    async fn multi_config(&self, ops: &[BatchOp]) -> Result<(), DeviceError>;

    /// Uploads certificate material.
    async fn import_file(&self, request: &ImportRequest) -> Result<(), DeviceError>;

    /// Runs an operational command and returns the `<result>` element.
    async fn op(&self, command: &Element) -> Result<Element, DeviceError>;

    /// Obtains an API key for a username/password pair.
    ///
    /// The key is ephemeral output; it is never persisted by this crate.
    async fn generate_api_key(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<SecretString, DeviceError>;
}
