use crate::clock::{Clock, SystemClock};
use crate::config::CredentialServiceConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::messages::{
    IssueCredentialRequest, IssueCredentialResponse, VerifyCredentialRequest, VerifyCredentialResponse,
};
use anyhow::Context;
use auth_chain::ChainValidator;
use auth_token::{Claims, Token, TokenSigner, TokenVerifier, VerificationResult};
use crypto::{decode_certificates, PrivateKey, SignatureAlgorithm};
use error_common::{log_rejection, CredentialError};
use logger_redacted::{redacted_debug, CredentialRedactor};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{field, info, instrument, warn, Span};
use trust_bundle::{JwtBundle, SpiffeId, TrustDomain, TrustStore, X509Bundle};

type Rejection = (&'static str, CredentialError);

/// Credential service facade
///
/// Composes decoding, chain validation and token verification. Every
/// failure of those stages becomes an `Invalid` verdict; only oversized
/// input is returned as an error.
pub struct CredentialService {
    config: CredentialServiceConfig,
    trust_store: Arc<TrustStore>,
    jwt_bundle: Option<JwtBundle>,
    signers: HashMap<String, TokenSigner>,
    chain_validator: ChainValidator,
    token_verifier: TokenVerifier,
    svid_verifier: TokenVerifier,
    redactor: CredentialRedactor,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CredentialService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialService")
            .field("trust_anchors", &self.trust_store.len())
            .field("jwt_bundle", &self.jwt_bundle.as_ref().map(JwtBundle::trust_domain))
            .field("signing_keys", &self.signers.keys().collect::<Vec<_>>())
            .field("max_chain_length", &self.chain_validator.max_chain_length())
            .finish_non_exhaustive()
    }
}

impl CredentialService {
    pub fn builder() -> CredentialServiceBuilder {
        CredentialServiceBuilder::default()
    }

    pub fn config(&self) -> &CredentialServiceConfig {
        &self.config
    }

    /// The shared trust store; writes through it are seen by later verifications
    pub fn trust_store(&self) -> &Arc<TrustStore> {
        &self.trust_store
    }

    pub fn jwt_bundle(&self) -> Option<&JwtBundle> {
        self.jwt_bundle.as_ref()
    }

    /// Verify a certificate chain and a token signed by its leaf key.
    ///
    /// `certificate_bytes` holds the leaf followed by any intermediates. On
    /// success the verdict carries the leaf identity (SPIFFE ID, or subject
    /// name when there is none) and the token claims.
    #[instrument(skip_all, fields(token = field::Empty, now = now))]
    pub fn verify_credential(
        &self,
        certificate_bytes: &[u8],
        token_bytes: &[u8],
        issuer: Option<&str>,
        now: i64,
    ) -> Result<VerificationResult, CredentialError> {
        self.check_input_size("certificate", certificate_bytes)?;
        self.check_input_size("token", token_bytes)?;
        self.record_token_tag(token_bytes);

        Ok(self.verdict(self.evaluate_credential(certificate_bytes, token_bytes, issuer, now)))
    }

    /// `VerifyCredential` at the current clock time.
    pub fn verify(&self, request: VerifyCredentialRequest) -> Result<VerifyCredentialResponse, CredentialError> {
        let result = self.verify_credential(
            &request.certificate_bytes,
            &request.token_bytes,
            request.issuer.as_deref(),
            self.clock.now(),
        )?;
        Ok(result.into())
    }

    /// `IssueCredential`: sign `claims` with the key registered as `key_id`.
    ///
    /// Missing `iat`, `exp` and `iss` are filled from the clock, the
    /// configured token TTL and the default issuer.
    #[instrument(skip_all, fields(key_id = %request.key_id))]
    pub fn issue(&self, request: IssueCredentialRequest) -> Result<IssueCredentialResponse, CredentialError> {
        let signer = self
            .signers
            .get(&request.key_id)
            .ok_or_else(|| CredentialError::KeyNotFound(request.key_id.clone()))?;

        let mut claims = request.claims;
        let issued_at = *claims.iat.get_or_insert(self.clock.now());
        claims
            .exp
            .get_or_insert(issued_at.saturating_add(self.config.token_ttl_seconds));
        if claims.iss.is_none() {
            claims.iss = self.config.default_issuer.clone();
        }

        let token = signer.sign(&claims)?;
        info!(
            algorithm = %signer.algorithm(),
            sub = ?claims.sub,
            exp = ?claims.exp,
            "Credential issued"
        );
        Ok(IssueCredentialResponse {
            token_bytes: token.into_string().into_bytes(),
        })
    }

    /// Verify a JWT-SVID against the configured JWT bundle.
    ///
    /// The key is selected by the header `kid`; `aud` is required and `sub`
    /// must be a SPIFFE ID in the bundle's trust domain.
    #[instrument(skip_all, fields(token = field::Empty, now = now))]
    pub fn verify_jwt_svid(
        &self,
        token_bytes: &[u8],
        issuer: Option<&str>,
        now: i64,
    ) -> Result<VerificationResult, CredentialError> {
        self.check_input_size("token", token_bytes)?;
        self.record_token_tag(token_bytes);
        Ok(self.verdict(self.evaluate_jwt_svid(token_bytes, issuer, now)))
    }

    /// `VerifyCredential` on a blocking worker, bounded by `deadline`.
    ///
    /// The deadline bounds the wait only: a verification that has started
    /// runs to completion on its worker even when the caller gives up.
    pub async fn verify_credential_within(
        self: Arc<Self>,
        request: VerifyCredentialRequest,
        deadline: Duration,
    ) -> ServiceResult<VerifyCredentialResponse> {
        let worker = tokio::task::spawn_blocking(move || self.verify(request));

        match tokio::time::timeout(deadline, worker).await {
            Ok(Ok(result)) => result.map_err(ServiceError::from),
            Ok(Err(join_error)) => Err(ServiceError::Worker(join_error.to_string())),
            Err(_) => {
                let millis = deadline.as_millis();
                warn!(millis, "Credential verification deadline exceeded");
                Err(ServiceError::DeadlineExceeded { millis })
            }
        }
    }

    fn check_input_size(&self, what: &str, input: &[u8]) -> Result<(), CredentialError> {
        if input.len() > self.config.max_input_bytes {
            warn!(
                input = what,
                len = input.len(),
                limit = self.config.max_input_bytes,
                "Input exceeds configured limit"
            );
            return Err(CredentialError::ResourceExhausted(format!(
                "{} input of {} bytes exceeds the {} byte limit",
                what,
                input.len(),
                self.config.max_input_bytes
            )));
        }
        Ok(())
    }

    /// Put the token's correlation tag on the current span; size is checked first.
    fn record_token_tag(&self, token_bytes: &[u8]) {
        Span::current().record("token", field::display(self.redactor.tag(token_bytes)));
    }

    fn verdict(&self, outcome: Result<(String, Claims), Rejection>) -> VerificationResult {
        match outcome {
            Ok((subject, claims)) => {
                info!(subject = %subject, "Credential verified");
                VerificationResult::Valid { subject, claims }
            }
            Err((stage, err)) => {
                log_rejection(stage, &err);
                VerificationResult::Invalid(err)
            }
        }
    }

    fn evaluate_credential(
        &self,
        certificate_bytes: &[u8],
        token_bytes: &[u8],
        issuer: Option<&str>,
        now: i64,
    ) -> Result<(String, Claims), Rejection> {
        let mut certificates = decode_certificates(certificate_bytes)
            .map_err(|e| ("decode", e))?
            .into_iter();
        let leaf = certificates
            .next()
            .ok_or_else(|| ("decode", CredentialError::malformed("no certificate supplied")))?;
        let intermediates: Vec<_> = certificates.collect();

        let chain = self
            .chain_validator
            .validate(&leaf, &intermediates, &self.trust_store.snapshot(), now)
            .map_err(|e| ("chain", e.into()))?;

        let token = Token::from_bytes(token_bytes).map_err(|e| {
            redacted_debug!("Unparseable token: {}", String::from_utf8_lossy(token_bytes));
            ("decode", e)
        })?;
        let issuer = issuer.or(self.config.default_issuer.as_deref());
        let (_, claims) = self
            .token_verifier
            .verify(&token, chain.leaf().public_key(), now, issuer)
            .into_result()
            .map_err(|e| ("token", e))?;

        Ok((chain.leaf_identity(), claims))
    }

    fn evaluate_jwt_svid(
        &self,
        token_bytes: &[u8],
        issuer: Option<&str>,
        now: i64,
    ) -> Result<(String, Claims), Rejection> {
        let bundle = self.jwt_bundle.as_ref().ok_or_else(|| {
            (
                "key",
                CredentialError::KeyNotFound("no JWT bundle is configured".to_string()),
            )
        })?;
        let token = Token::from_bytes(token_bytes).map_err(|e| ("decode", e))?;
        let key_id = token
            .header()
            .kid
            .as_deref()
            .ok_or_else(|| ("key", CredentialError::malformed("token header has no 'kid'")))?;
        let key = bundle
            .get_jwt_authority(key_id)
            .map_err(|e| ("key", e))?
            .ok_or_else(|| ("key", CredentialError::KeyNotFound(key_id.to_string())))?;

        let issuer = issuer.or(self.config.default_issuer.as_deref());
        let (subject, claims) = self
            .svid_verifier
            .verify(&token, key, now, issuer)
            .into_result()
            .map_err(|e| ("token", e))?;

        let spiffe_id = SpiffeId::parse(&subject).map_err(|e| ("subject", e))?;
        if !spiffe_id.is_member_of(bundle.trust_domain()) {
            return Err((
                "subject",
                CredentialError::InvalidArgument(format!(
                    "subject {} is not a member of trust domain {}",
                    spiffe_id,
                    bundle.trust_domain()
                )),
            ));
        }
        Ok((spiffe_id.to_string(), claims))
    }
}

/// Builder for [`CredentialService`]
///
/// Anything not supplied explicitly is taken from the configuration:
/// bundle paths are loaded at `build` time.
pub struct CredentialServiceBuilder {
    config: CredentialServiceConfig,
    trust_store: Option<Arc<TrustStore>>,
    jwt_bundle: Option<JwtBundle>,
    signers: HashMap<String, TokenSigner>,
    clock: Arc<dyn Clock>,
}

impl Default for CredentialServiceBuilder {
    fn default() -> Self {
        Self {
            config: CredentialServiceConfig::default(),
            trust_store: None,
            jwt_bundle: None,
            signers: HashMap::new(),
            clock: Arc::new(SystemClock),
        }
    }
}

impl CredentialServiceBuilder {
    pub fn config(mut self, config: CredentialServiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn trust_store(mut self, trust_store: Arc<TrustStore>) -> Self {
        self.trust_store = Some(trust_store);
        self
    }

    pub fn jwt_bundle(mut self, bundle: JwtBundle) -> Self {
        self.jwt_bundle = Some(bundle);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Register a signing key for `IssueCredential` under `key_id`.
    pub fn signing_key(
        mut self,
        key_id: impl Into<String>,
        key: PrivateKey,
        algorithm: SignatureAlgorithm,
    ) -> ServiceResult<Self> {
        let key_id = key_id.into();
        let signer = TokenSigner::new(key, algorithm, Some(key_id.clone()))?;
        self.signers.insert(key_id, signer);
        Ok(self)
    }

    pub fn build(self) -> ServiceResult<CredentialService> {
        let config = self.config;
        config.validate()?;

        let redactor = CredentialRedactor::new(config.redaction.clone())
            .map_err(|e| ServiceError::Configuration(format!("invalid redaction pattern: {}", e)))?;

        let trust_store = match self.trust_store {
            Some(store) => store,
            None => Arc::new(load_trust_store(&config)?),
        };
        if trust_store.is_empty() {
            warn!("Credential service has no trust anchors; every chain will be rejected");
        }

        if let Some((key_id, signer)) = self
            .signers
            .iter()
            .find(|(_, signer)| !config.permitted_algorithms.contains(&signer.algorithm()))
        {
            return Err(ServiceError::Configuration(format!(
                "signing key '{}' uses {}, which is not a permitted algorithm",
                key_id,
                signer.algorithm()
            )));
        }

        let jwt_bundle = match self.jwt_bundle {
            Some(bundle) => Some(bundle),
            None => load_jwt_bundle(&config)?,
        };

        let token_verifier = TokenVerifier::new(config.permitted_algorithms.iter().copied())
            .with_audience(config.expected_audience.iter().cloned());
        let svid_verifier = token_verifier.clone().requiring_audience_claim();

        info!(
            trust_anchors = trust_store.len(),
            jwt_authorities = jwt_bundle.as_ref().map_or(0, JwtBundle::len),
            signing_keys = self.signers.len(),
            max_chain_length = config.max_chain_length,
            "Credential service initialized"
        );

        Ok(CredentialService {
            chain_validator: ChainValidator::new(config.max_chain_length),
            token_verifier,
            svid_verifier,
            trust_store,
            jwt_bundle,
            signers: self.signers,
            redactor,
            clock: self.clock,
            config,
        })
    }
}

fn configured_domain(config: &CredentialServiceConfig) -> ServiceResult<TrustDomain> {
    let name = config
        .trust_domain
        .as_deref()
        .ok_or_else(|| ServiceError::Configuration("trust_domain is not set".to_string()))?;
    Ok(TrustDomain::new(name)?)
}

fn load_trust_store(config: &CredentialServiceConfig) -> ServiceResult<TrustStore> {
    let Some(path) = config.trust_bundle_path.as_deref() else {
        return Ok(TrustStore::new());
    };
    let bundle = X509Bundle::load(configured_domain(config)?, path, config.trust_bundle_encoding)
        .map_err(|source| ServiceError::Bundle {
            what: "trust bundle",
            source,
        })?;
    Ok(TrustStore::from_bundle(&bundle))
}

fn load_jwt_bundle(config: &CredentialServiceConfig) -> ServiceResult<Option<JwtBundle>> {
    let Some(path) = config.jwt_bundle_path.as_deref() else {
        return Ok(None);
    };
    let bundle = read_jwt_bundle(configured_domain(config)?, path).map_err(|source| ServiceError::Bundle {
        what: "JWT bundle",
        source,
    })?;
    info!(
        path = %path.display(),
        authorities = bundle.len(),
        "Loaded JWT bundle"
    );
    Ok(Some(bundle))
}

fn read_jwt_bundle(trust_domain: TrustDomain, path: &Path) -> anyhow::Result<JwtBundle> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read JWT bundle {}", path.display()))?;
    JwtBundle::parse(trust_domain, &bytes)
        .with_context(|| format!("failed to parse JWT bundle {}", path.display()))
}
