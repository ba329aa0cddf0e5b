// Copyright (c) 2024 The sunsa-intg authors
// SPDX-License-Identifier: MPL-2.0

use log::{error, warn};
use rustls::ClientConfig;
use rustls_platform_verifier::ConfigVerifierExt;
use std::sync::Arc;
use std::time::Duration;

/// Create an HTTP client for the Sunsa cloud API.
///
/// Creating a client is expensive. One client is sufficient per process and can be cloned.
///
/// # Arguments
///
/// * `request_timeout`: total time allowed for a request, including connection setup.
/// * `tls`: use a rustls connector with the platform certificate verifier.
/// * `disable_cert_verification`: accept any server certificate. Only for debugging!
pub fn new_http_client(
    request_timeout: Duration,
    tls: bool,
    disable_cert_verification: bool,
) -> awc::Client {
    if !tls {
        return awc::Client::builder().timeout(request_timeout).finish();
    }

    // ignore error: a provider might already be installed
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let mut config = match ClientConfig::with_platform_verifier() {
        Ok(config) => config,
        Err(e) => {
            error!("Platform certificate verifier not available, using defaults: {e}");
            return awc::Client::builder().timeout(request_timeout).finish();
        }
    };
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    if disable_cert_verification {
        warn!("TLS certificate verification is disabled!");
        config
            .dangerous()
            .set_certificate_verifier(Arc::new(danger::NoCertificateVerification::new()));
    }

    let connector = awc::Connector::new()
        .timeout(request_timeout)
        .rustls_0_23(Arc::new(config));
    awc::Client::builder()
        .timeout(request_timeout)
        .connector(connector)
        .finish()
}

mod danger {
    use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
    use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
    use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
    use rustls::{DigitallySignedStruct, SignatureScheme};

    #[derive(Debug)]
    pub struct NoCertificateVerification(CryptoProvider);

    impl NoCertificateVerification {
        pub fn new() -> Self {
            Self(rustls::crypto::aws_lc_rs::default_provider())
        }
    }

    impl ServerCertVerifier for NoCertificateVerification {
        fn verify_server_cert(
            &self,
            _end_entity: &CertificateDer<'_>,
            _intermediates: &[CertificateDer<'_>],
            _server_name: &ServerName<'_>,
            _ocsp_response: &[u8],
            _now: UnixTime,
        ) -> Result<ServerCertVerified, rustls::Error> {
            Ok(ServerCertVerified::assertion())
        }

        fn verify_tls12_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, rustls::Error> {
            verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
        }

        fn verify_tls13_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, rustls::Error> {
            verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
        }

        fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
            self.0.signature_verification_algorithms.supported_schemes()
        }
    }
}
