//! Production XML-API client over HTTP(S).

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use super::{DeviceClient, DeviceError, ImportRequest};
use crate::version::ApiVersion;
use crate::xmlapi::{BatchOp, Element, XmlError, build_multi_config};

/// Device error code for "no such node".
const CODE_OBJECT_NOT_FOUND: &str = "7";

/// How the client authenticates.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// A pre-provisioned API key.
    ApiKey(SecretString),
    /// Username and password, exchanged for an API key at connect time.
    Password {
        /// Administrator name.
        username: String,
        /// Administrator password.
        password: SecretString,
    },
}

/// Connection options for [`PanClient`].
#[derive(Debug, Clone)]
pub struct PanClientConfig {
    /// Device hostname or address. Must be non-empty.
    pub hostname: String,
    /// `https` (default) or `http`.
    pub protocol: String,
    /// Optional non-standard port.
    pub port: Option<u16>,
    /// Authentication material.
    pub credentials: Credentials,
    /// Pass-through target serial for connections brokered by Panorama.
    pub target: Option<String>,
    /// Send the API key as a request parameter instead of a header.
    pub api_key_in_request: bool,
    /// Extra headers sent with every request.
    pub additional_headers: Vec<(String, String)>,
    /// Skip TLS certificate verification.
    pub skip_verify_certificate: bool,
    /// Quote character for xpath predicates.
    pub filter_quote: char,
}

impl PanClientConfig {
    /// Minimal config for a hostname and API key; everything else at
    /// defaults.
    #[must_use]
    pub fn new(hostname: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            hostname: hostname.into(),
            protocol: "https".to_string(),
            port: None,
            credentials: Credentials::ApiKey(api_key),
            target: None,
            api_key_in_request: false,
            additional_headers: Vec::new(),
            skip_verify_certificate: false,
            filter_quote: '\'',
        }
    }
}

/// The production device client.
pub struct PanClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    target: Option<String>,
    api_key_in_request: bool,
    filter_quote: char,
    version: ApiVersion,
}

impl PanClient {
    /// Connects to the device: exchanges credentials for an API key when
    /// needed and negotiates the software version.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Transport`] when the HTTP client cannot be
    /// built or the device is unreachable, and surfaces device errors
    /// from key generation and version discovery verbatim.
    pub async fn connect(config: PanClientConfig) -> Result<Self, DeviceError> {
        if config.hostname.is_empty() {
            return Err(DeviceError::Transport(
                "device hostname is empty".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        for (name, value) in &config.additional_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| DeviceError::Transport(format!("invalid header name: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| DeviceError::Transport(format!("invalid header value: {e}")))?;
            headers.insert(name, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(config.skip_verify_certificate)
            .connect_timeout(std::time::Duration::from_secs(15))
            .build()
            .map_err(|e| DeviceError::Transport(e.to_string()))?;

        let port = config
            .port
            .map(|p| format!(":{p}"))
            .unwrap_or_default();
        let base_url = format!("{}://{}{}/api/", config.protocol, config.hostname, port);

        let mut client = Self {
            http,
            base_url,
            api_key: SecretString::from(String::new()),
            target: config.target,
            api_key_in_request: config.api_key_in_request,
            filter_quote: config.filter_quote,
            version: ApiVersion::default(),
        };

        client.api_key = match config.credentials {
            Credentials::ApiKey(key) => key,
            Credentials::Password { username, password } => {
                client.keygen(&username, &password).await?
            }
        };

        client.version = client.fetch_version().await?;
        debug!(version = %client.version, "connected to device");
        Ok(client)
    }

    async fn keygen(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<SecretString, DeviceError> {
        let params = vec![
            ("type", "keygen".to_string()),
            ("user", username.to_string()),
            ("password", password.expose_secret().to_string()),
        ];
        let result = self.request_unauthenticated(params).await?;
        let key = result
            .child_text("key")
            .filter(|k| !k.is_empty())
            .ok_or_else(|| DeviceError::Xml(XmlError::Malformed {
                reason: "keygen response has no <key>".to_string(),
            }))?;
        Ok(SecretString::from(key))
    }

    async fn fetch_version(&self) -> Result<ApiVersion, DeviceError> {
        let command = Element::new("show")
            .with_child(Element::new("system").with_child(Element::new("info")));
        let result = self.op(&command).await?;
        let raw = result
            .child("system")
            .and_then(|s| s.child_text("sw-version"))
            .ok_or_else(|| DeviceError::Xml(XmlError::Malformed {
                reason: "system info has no <sw-version>".to_string(),
            }))?;
        raw.parse()
            .map_err(|e| DeviceError::Transport(format!("bad device version: {e}")))
    }

    /// Sends a request without attaching the API key (keygen only).
    async fn request_unauthenticated(
        &self,
        params: Vec<(&str, String)>,
    ) -> Result<Element, DeviceError> {
        let response = self
            .http
            .post(&self.base_url)
            .form(&params)
            .send()
            .await?;
        Self::into_result(&response.text().await?)
    }

    async fn request(&self, mut params: Vec<(&str, String)>) -> Result<Element, DeviceError> {
        if let Some(target) = &self.target {
            params.push(("target", target.clone()));
        }
        let mut builder = self.http.post(&self.base_url);
        if self.api_key_in_request {
            params.push(("key", self.api_key.expose_secret().to_string()));
        } else {
            builder = builder.header("X-PAN-KEY", self.api_key.expose_secret());
        }
        let response = builder.form(&params).send().await?;
        Self::into_result(&response.text().await?)
    }

    /// Parses the `<response>` envelope and maps failures.
    fn into_result(body: &str) -> Result<Element, DeviceError> {
        let root = Element::parse(body)?;
        if root.name != "response" {
            return Err(DeviceError::Xml(XmlError::Malformed {
                reason: format!("expected <response>, got <{}>", root.name),
            }));
        }
        if root.attr("status") == Some("success") {
            return Ok(root
                .child("result")
                .cloned()
                .unwrap_or_else(|| Element::new("result")));
        }

        let code = root.attr("code").map(str::to_string);
        let message = extract_message(&root);
        if code.as_deref() == Some(CODE_OBJECT_NOT_FOUND) {
            return Err(DeviceError::ObjectNotFound);
        }
        Err(DeviceError::Api { code, message })
    }
}

/// Pulls the device's message text out of an error envelope.
fn extract_message(root: &Element) -> String {
    let msg = root
        .child("msg")
        .or_else(|| root.child("result").and_then(|r| r.child("msg")));
    if let Some(msg) = msg {
        let lines: Vec<String> = msg.children_named("line").map(Element::text).collect();
        if lines.is_empty() {
            return msg.text();
        }
        return lines.join("; ");
    }
    root.text()
}

#[async_trait]
impl DeviceClient for PanClient {
    fn version(&self) -> ApiVersion {
        self.version
    }

    fn filter_quote(&self) -> char {
        self.filter_quote
    }

    async fn get_config(&self, xpath: &str) -> Result<Element, DeviceError> {
        debug!(xpath, "config get");
        self.request(vec![
            ("type", "config".to_string()),
            ("action", "get".to_string()),
            ("xpath", xpath.to_string()),
        ])
        .await
    }

    async fn show_config(&self, xpath: &str) -> Result<Element, DeviceError> {
        debug!(xpath, "config show");
        self.request(vec![
            ("type", "config".to_string()),
            ("action", "show".to_string()),
            ("xpath", xpath.to_string()),
        ])
        .await
    }

    async fn edit_config(&self, xpath: &str, element: &Element) -> Result<(), DeviceError> {
        debug!(xpath, "config edit");
        self.request(vec![
            ("type", "config".to_string()),
            ("action", "edit".to_string()),
            ("xpath", xpath.to_string()),
            ("element", element.to_xml()),
        ])
        .await
        .map(|_| ())
    }

    async fn rename(&self, xpath: &str, new_name: &str) -> Result<(), DeviceError> {
        debug!(xpath, new_name, "config rename");
        self.request(vec![
            ("type", "config".to_string()),
            ("action", "rename".to_string()),
            ("xpath", xpath.to_string()),
            ("newname", new_name.to_string()),
        ])
        .await
        .map(|_| ())
    }

    async fn delete(&self, xpath: &str) -> Result<(), DeviceError> {
        debug!(xpath, "config delete");
        match self
            .request(vec![
                ("type", "config".to_string()),
                ("action", "delete".to_string()),
                ("xpath", xpath.to_string()),
            ])
            .await
        {
            Ok(_) | Err(DeviceError::ObjectNotFound) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn multi_config(&self, ops: &[BatchOp]) -> Result<(), DeviceError> {
        debug!(operations = ops.len(), "multi-config batch");
        let element = build_multi_config(ops);
        self.request(vec![
            ("type", "config".to_string()),
            ("action", "multi-config".to_string()),
            ("element", element.to_xml()),
        ])
        .await
        .map(|_| ())
    }

    async fn import_file(&self, request: &ImportRequest) -> Result<(), DeviceError> {
        debug!(
            category = request.category.as_str(),
            name = %request.certificate_name,
            "file import"
        );
        let mut params = vec![
            ("type", "import".to_string()),
            ("category", request.category.as_str().to_string()),
            ("certificate-name", request.certificate_name.clone()),
        ];
        if let Some(format) = &request.format {
            params.push(("format", format.clone()));
        }
        if let Some(passphrase) = &request.passphrase {
            params.push(("passphrase", passphrase.expose_secret().to_string()));
        }
        if let Some(tpl) = &request.target_tpl {
            params.push(("target-tpl", tpl.clone()));
        }
        if let Some(vsys) = &request.target_tpl_vsys {
            params.push(("target-tpl-vsys", vsys.clone()));
        }
        if let Some(target) = &self.target {
            params.push(("target", target.clone()));
        }
        if self.api_key_in_request {
            params.push(("key", self.api_key.expose_secret().to_string()));
        }

        let part = reqwest::multipart::Part::bytes(request.content.clone())
            .file_name(request.file_name.clone());
        let form = reqwest::multipart::Form::new().part("file", part);

        let mut builder = self.http.post(&self.base_url).query(&params);
        if !self.api_key_in_request {
            builder = builder.header("X-PAN-KEY", self.api_key.expose_secret());
        }
        let response = builder.multipart(form).send().await?;
        Self::into_result(&response.text().await?).map(|_| ())
    }

    async fn op(&self, command: &Element) -> Result<Element, DeviceError> {
        debug!(command = %command.name, "operational command");
        self.request(vec![
            ("type", "op".to_string()),
            ("cmd", command.to_xml()),
        ])
        .await
    }

    async fn generate_api_key(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<SecretString, DeviceError> {
        self.keygen(username, password).await
    }
}
