//! Certificate import.
//!
//! The only resource whose payload travels through the file-import
//! endpoint instead of config edits, in two flavors: PEM (certificate
//! plus optional private key and passphrase) and PKCS#12 (one
//! base64-encoded bundle). The device accepts a single file import at
//! a time, so every upload sequence runs under the process-wide import
//! lock.
//!
//! Read cannot fetch the imported material back in cleartext; it
//! compares what the device *does* expose (the public-key PEM) against
//! the declared material, which for PKCS#12 means decoding the declared
//! bundle locally and re-encoding its certificate.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::SecretString;
use tracing::{debug, info};

use palisade_core::client::{DeviceError, ImportCategory, ImportRequest};
use palisade_core::import_lock::acquire_import_lock;
use palisade_core::ledger::{EncryptedValues, HashingType};
use palisade_core::location::{Location, LocationKind, LocationModel};
use palisade_core::manager::{DeviceEntryService, EntryManager, EntryObject};
use palisade_core::tfid::{self, ResourceIdentity, TfidError};
use palisade_core::version::ApiVersion;
use palisade_core::xmlapi::{Element, XmlError};

use super::{ManagedResource, ResourceError, validate_entry_name};
use crate::provider::Provider;

/// Substituted for an empty declared passphrase on private-key upload.
///
/// The device rejects key imports with an empty passphrase, so an empty
/// declared passphrase is replaced with this documented placeholder on
/// the wire only; the stored state keeps the declared (empty) value.
pub const FALLBACK_KEY_PASSPHRASE: &str = "dummy-passphrase";

/// Marker written into the declared-certificate cell when the device
/// holds different material, so the orchestrator plans a replacement.
pub const OUTDATED: &str = "[outdated]";

/// Ledger key for the private key.
const KEY_XPATH: &str = "/private-key";

/// Ledger key for the passphrase.
const PASSPHRASE_XPATH: &str = "/passphrase";

const ALLOWED: &[LocationKind] = &[
    LocationKind::Shared,
    LocationKind::Vsys,
    LocationKind::Template,
    LocationKind::TemplateVsys,
    LocationKind::TemplateStack,
    LocationKind::TemplateStackVsys,
    LocationKind::Panorama,
];

/// Device-side certificate entry (what `get` exposes about an imported
/// certificate).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateEntry {
    /// Primary key.
    pub name: String,
    /// Public certificate in PEM form.
    pub public_key: Option<String>,
    /// Private key in the device's opaque ciphertext form.
    pub private_key: Option<String>,
    /// Key algorithm as reported by the device.
    pub algorithm: Option<String>,
    /// Subject common name.
    pub common_name: Option<String>,
    /// Expiry timestamp as reported by the device.
    pub not_valid_after: Option<String>,
}

impl EntryObject for CertificateEntry {
    const SUFFIX: &'static [&'static str] = &["certificate"];

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn to_element(&self, _version: &ApiVersion) -> Element {
        // Certificates are written via the import endpoint; this codec
        // exists for listing and read-back symmetry.
        let mut entry = Element::new("entry").with_attr("name", self.name.clone());
        if let Some(public_key) = &self.public_key {
            entry.push_child(Element::new("public-key").with_text(public_key.clone()));
        }
        if let Some(private_key) = &self.private_key {
            entry.push_child(Element::new("private-key").with_text(private_key.clone()));
        }
        if let Some(algorithm) = &self.algorithm {
            entry.push_child(Element::new("algorithm").with_text(algorithm.clone()));
        }
        if let Some(common_name) = &self.common_name {
            entry.push_child(Element::new("common-name").with_text(common_name.clone()));
        }
        if let Some(not_valid_after) = &self.not_valid_after {
            entry.push_child(Element::new("not-valid-after").with_text(not_valid_after.clone()));
        }
        entry
    }

    fn from_element(element: &Element, _version: &ApiVersion) -> Result<Self, DeviceError> {
        let name = element
            .attr("name")
            .ok_or_else(|| {
                DeviceError::Xml(XmlError::Malformed {
                    reason: "certificate entry without a name".to_string(),
                })
            })?
            .to_string();
        Ok(Self {
            name,
            public_key: element.child_text("public-key"),
            private_key: element.child_text("private-key"),
            algorithm: element.child_text("algorithm"),
            common_name: element.child_text("common-name"),
            not_valid_after: element.child_text("not-valid-after"),
        })
    }

    fn specs_match(&self, other: &Self) -> bool {
        // The private key is device-opaque ciphertext and excluded.
        self.public_key == other.public_key
            && self.algorithm == other.algorithm
            && self.common_name == other.common_name
            && self.not_valid_after == other.not_valid_after
    }
}

/// Declared PEM material.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PemSpec {
    /// Certificate body, PEM.
    pub certificate: String,
    /// Private key, PEM. Sensitive.
    pub private_key: Option<String>,
    /// Key passphrase. Sensitive; an empty value is substituted with
    /// [`FALLBACK_KEY_PASSPHRASE`] on upload.
    pub passphrase: Option<String>,
}

/// Declared PKCS#12 material.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pkcs12Spec {
    /// The whole bundle, base64-encoded. Sensitive.
    pub bundle: String,
    /// Bundle passphrase. Sensitive.
    pub passphrase: String,
}

/// Orchestrator-facing certificate model.
#[derive(Debug, Clone, Default)]
pub struct CertificateModel {
    /// Placement.
    pub location: LocationModel,
    /// Entry name.
    pub name: String,
    /// PEM flavor; exclusive with `pkcs12`.
    pub pem: Option<PemSpec>,
    /// PKCS#12 flavor; exclusive with `pem`.
    pub pkcs12: Option<Pkcs12Spec>,
    /// Subject common name (computed).
    pub common_name: Option<String>,
    /// Key algorithm (computed).
    pub algorithm: Option<String>,
    /// Expiry timestamp (computed).
    pub not_valid_after: Option<String>,
    /// Plaintext⇄ciphertext pairs for the sensitive attributes.
    pub encrypted: EncryptedValues,
    /// Computed opaque identity.
    pub tfid: Option<String>,
}

impl CertificateModel {
    fn resolve_location(&self) -> Result<Location, ResourceError> {
        let location = self.location.resolve()?;
        location.check_allowed(ALLOWED)?;
        Ok(location)
    }

    fn require_one_flavor(&self) -> Result<(), ResourceError> {
        match (&self.pem, &self.pkcs12) {
            (Some(_), None) | (None, Some(_)) => Ok(()),
            _ => Err(ResourceError::Validation(
                "certificate requires exactly one of pem, pkcs12".to_string(),
            )),
        }
    }

    /// Runs the import protocol for the declared material. Holds the
    /// process-wide import lock across all uploads; the lock is
    /// released on every exit path when the guard drops.
    async fn run_import(
        &mut self,
        provider: &Provider,
        location: &Location,
    ) -> Result<(), ResourceError> {
        let client = provider.connected()?.clone();
        let (target_tpl, target_tpl_vsys) = location.import_targets();
        let target_tpl = target_tpl.map(str::to_string);
        let target_tpl_vsys = target_tpl_vsys.map(str::to_string);

        let _guard = acquire_import_lock().await;

        if let Some(pem) = &self.pem {
            info!(name = %self.name, "importing PEM certificate");
            client
                .import_file(&ImportRequest {
                    category: ImportCategory::Certificate,
                    format: Some("pem".to_string()),
                    certificate_name: self.name.clone(),
                    passphrase: None,
                    target_tpl: target_tpl.clone(),
                    target_tpl_vsys: target_tpl_vsys.clone(),
                    file_name: format!("{}.pem", self.name),
                    content: pem.certificate.clone().into_bytes(),
                })
                .await?;

            if let Some(private_key) = &pem.private_key {
                let declared = pem.passphrase.clone().unwrap_or_default();
                let passphrase = if declared.is_empty() {
                    FALLBACK_KEY_PASSPHRASE.to_string()
                } else {
                    declared.clone()
                };
                client
                    .import_file(&ImportRequest {
                        category: ImportCategory::PrivateKey,
                        format: Some("pem".to_string()),
                        certificate_name: self.name.clone(),
                        passphrase: Some(SecretString::from(passphrase)),
                        target_tpl,
                        target_tpl_vsys,
                        file_name: format!("{}.key", self.name),
                        content: private_key.clone().into_bytes(),
                    })
                    .await?;

                self.encrypted
                    .store_plaintext(KEY_XPATH, HashingType::Solo, private_key.clone())?;
                self.encrypted
                    .store_plaintext(PASSPHRASE_XPATH, HashingType::Solo, declared)?;
            }
        } else if let Some(pkcs12) = &self.pkcs12 {
            info!(name = %self.name, "importing PKCS#12 bundle");
            let content = STANDARD.decode(pkcs12.bundle.trim()).map_err(|_| {
                ResourceError::Validation("pkcs12.bundle is not valid base64".to_string())
            })?;
            client
                .import_file(&ImportRequest {
                    category: ImportCategory::Certificate,
                    format: Some("pkcs12".to_string()),
                    certificate_name: self.name.clone(),
                    passphrase: Some(SecretString::from(pkcs12.passphrase.clone())),
                    target_tpl,
                    target_tpl_vsys,
                    file_name: format!("{}.pfx", self.name),
                    content,
                })
                .await?;

            self.encrypted.store_plaintext(
                PASSPHRASE_XPATH,
                HashingType::Solo,
                pkcs12.passphrase.clone(),
            )?;
        }

        Ok(())
    }

    /// Mirrors the computed cells and the server-side key ciphertext.
    fn apply_computed(&mut self, entry: &CertificateEntry) -> Result<(), ResourceError> {
        self.name = entry.name.clone();
        self.common_name = entry.common_name.clone();
        self.algorithm = entry.algorithm.clone();
        self.not_valid_after = entry.not_valid_after.clone();
        if let Some(ciphertext) = &entry.private_key {
            self.encrypted
                .store_ciphertext(KEY_XPATH, HashingType::Solo, ciphertext.clone())?;
        }
        Ok(())
    }

    /// Full Read semantics: computed cells plus drift detection against
    /// the server's public-key PEM.
    fn apply_read(&mut self, entry: &CertificateEntry) -> Result<(), ResourceError> {
        self.apply_computed(entry)?;
        let server_pem = entry.public_key.as_deref().unwrap_or_default().trim().to_string();

        if let Some(pem) = &mut self.pem {
            if pem.certificate.trim() != server_pem {
                debug!(name = %self.name, "certificate drift: adopting server material");
                pem.certificate = server_pem;
            }
        } else if let Some(pkcs12) = &mut self.pkcs12 {
            let declared_der = pkcs12_certificate_der(&pkcs12.bundle, &pkcs12.passphrase)?;
            let matches = pem_body(&server_pem)
                .map(|server_der| server_der == declared_der)
                .unwrap_or(false);
            if !matches {
                debug!(name = %self.name, "certificate drift: marking bundle outdated");
                pkcs12.bundle = OUTDATED.to_string();
            }
        }
        Ok(())
    }

    fn stamp_tfid(&mut self, location: Location) -> Result<(), TfidError> {
        self.tfid = Some(tfid::encode(&ResourceIdentity::singleton(
            self.name.as_str(),
            location,
        ))?);
        Ok(())
    }
}

fn manager(provider: &Provider) -> Result<EntryManager<DeviceEntryService<CertificateEntry>>, ResourceError> {
    Ok(EntryManager::new(DeviceEntryService::new(
        provider.connected()?.clone(),
    )))
}

/// Extracts the first certificate of a PKCS#12 bundle as DER.
///
/// # Errors
///
/// Returns [`ResourceError::Validation`] on bad base64, an unparseable
/// bundle, a wrong passphrase, or a bundle without a certificate.
/// Decode failures are fatal: Read surfaces them rather than guessing.
fn pkcs12_certificate_der(bundle_b64: &str, passphrase: &str) -> Result<Vec<u8>, ResourceError> {
    let der = STANDARD.decode(bundle_b64.trim()).map_err(|_| {
        ResourceError::Validation("pkcs12.bundle is not valid base64".to_string())
    })?;
    let pfx = p12::PFX::parse(&der).map_err(|e| {
        ResourceError::Validation(format!("cannot parse PKCS#12 bundle: {e:?}"))
    })?;
    let certs = pfx.cert_bags(passphrase).map_err(|e| {
        ResourceError::Validation(format!("cannot decrypt PKCS#12 bundle: {e:?}"))
    })?;
    certs.into_iter().next().ok_or_else(|| {
        ResourceError::Validation("PKCS#12 bundle holds no certificate".to_string())
    })
}

/// Re-encodes certificate DER as PEM with 64-column base64 lines.
#[must_use]
pub fn pem_encode_certificate(der: &[u8]) -> String {
    let b64 = STANDARD.encode(der);
    let mut out = String::from("-----BEGIN CERTIFICATE-----\n");
    for chunk in b64.as_bytes().chunks(64) {
        out.push_str(std::str::from_utf8(chunk).unwrap_or_default());
        out.push('\n');
    }
    out.push_str("-----END CERTIFICATE-----");
    out
}

/// Decodes the base64 body between a PEM header and footer.
fn pem_body(pem: &str) -> Option<Vec<u8>> {
    let body: String = pem
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .collect::<Vec<_>>()
        .join("");
    let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(compact).ok()
}

#[async_trait]
impl ManagedResource for CertificateModel {
    async fn create(provider: &Provider, mut planned: Self) -> Result<Self, ResourceError> {
        validate_entry_name(&planned.name)?;
        let location = planned.resolve_location()?;
        planned.require_one_flavor()?;

        planned.run_import(provider, &location).await?;

        let entry = manager(provider)?.read(&location, &planned.name).await?;
        planned.apply_computed(&entry)?;
        planned.stamp_tfid(location)?;
        Ok(planned)
    }

    async fn read(provider: &Provider, mut state: Self) -> Result<Option<Self>, ResourceError> {
        let location = state.resolve_location()?;
        let entry = match manager(provider)?.read(&location, &state.name).await {
            Ok(entry) => entry,
            Err(DeviceError::ObjectNotFound) => {
                debug!(name = %state.name, "certificate vanished, removing from state");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        state.apply_read(&entry)?;
        state.stamp_tfid(location)?;
        Ok(Some(state))
    }

    async fn update(
        provider: &Provider,
        state: Self,
        mut planned: Self,
    ) -> Result<Self, ResourceError> {
        validate_entry_name(&planned.name)?;
        let location = planned.resolve_location()?;
        planned.require_one_flavor()?;
        let manager = manager(provider)?;

        let renamed = planned.name != state.name;
        if renamed {
            match manager.read(&location, &planned.name).await {
                Ok(_) => {
                    return Err(DeviceError::Conflict {
                        name: planned.name.clone(),
                    }
                    .into());
                }
                Err(DeviceError::ObjectNotFound) => {}
                Err(e) => return Err(e.into()),
            }
        }

        // Updates always re-import the declared material.
        planned.run_import(provider, &location).await?;

        if renamed {
            manager
                .delete(&location, &[state.name.clone()])
                .await?;
        }

        let entry = manager.read(&location, &planned.name).await?;
        planned.apply_computed(&entry)?;
        planned.stamp_tfid(location)?;
        Ok(planned)
    }

    async fn delete(provider: &Provider, state: Self) -> Result<(), ResourceError> {
        let location = state.resolve_location()?;
        manager(provider)?
            .delete(&location, &[state.name.clone()])
            .await?;
        Ok(())
    }

    async fn import(_provider: &Provider, id: &str) -> Result<Self, ResourceError> {
        let identity = tfid::decode(id)?;
        let name = identity.name.clone().ok_or_else(|| {
            TfidError::Invalid("a certificate imports a single 'name'".to_string())
        })?;
        identity.location.check_allowed(ALLOWED)?;

        Ok(Self {
            location: LocationModel::from(&identity.location),
            name,
            tfid: Some(id.to_string()),
            ..Self::default()
        })
    }
}
