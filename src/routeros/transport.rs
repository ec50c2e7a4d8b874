// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Byte transport: plain TCP or TLS-wrapped TCP
//!
//! RouterOS speaks the same framing on both; the session layer only sees an
//! `ApiStream`. The TLS trust decision is an explicit configuration value,
//! never a silent default baked into the connector.

use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use rustls::pki_types::{CertificateDer, ServerName};
use rustls::{ClientConfig, RootCertStore};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use crate::error::{AppError, Result};

/// Server certificate policy for TLS sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsVerify {
    /// Accept any certificate, skip hostname checks. This matches the
    /// RouterOS ecosystem default of self-signed device certificates.
    AcceptAny,
    /// Verify the peer against the PEM trust roots in the given file.
    CaFile(PathBuf),
}

/// A connected byte channel to the router.
#[derive(Debug)]
pub(crate) enum ApiStream {
    Tcp(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl ApiStream {
    /// Opens TCP to `host:port`, then wraps it in TLS when a verification
    /// policy is given. Both steps run under `connect_timeout`.
    pub(crate) async fn open(
        host: &str,
        port: u16,
        tls: Option<&TlsVerify>,
        connect_timeout: Duration,
    ) -> Result<Self> {
        tracing::trace!("Attempting TCP connection to: {}:{}", host, port);
        let stream = timeout(connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| AppError::Timeout(connect_timeout))??;
        tracing::trace!("TCP connection established to: {}:{}", host, port);

        let Some(verify) = tls else {
            return Ok(Self::Tcp(stream));
        };

        let config = client_config(verify)?;
        let connector = TlsConnector::from(Arc::new(config));
        let name = ServerName::try_from(host.to_string())
            .map_err(|e| AppError::Tls(format!("invalid server name {host:?}: {e}")))?;
        let tls_stream = timeout(connect_timeout, connector.connect(name, stream))
            .await
            .map_err(|_| AppError::Timeout(connect_timeout))??;
        tracing::trace!("TLS handshake complete with {}:{}", host, port);
        Ok(Self::Tls(Box::new(tls_stream)))
    }
}

fn client_config(verify: &TlsVerify) -> Result<ClientConfig> {
    match verify {
        TlsVerify::AcceptAny => {
            let provider = rustls::crypto::ring::default_provider();
            Ok(ClientConfig::builder()
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(danger::AcceptAnyServerCert(provider)))
                .with_no_client_auth())
        }
        TlsVerify::CaFile(path) => {
            let pem = std::fs::read(path).map_err(|e| {
                AppError::Config(format!("cannot read TLS trust roots {}: {e}", path.display()))
            })?;
            let certs: Vec<CertificateDer<'static>> =
                rustls_pemfile::certs(&mut &pem[..]).collect::<io::Result<_>>()?;
            if certs.is_empty() {
                return Err(AppError::Config(format!(
                    "no certificates found in {}",
                    path.display()
                )));
            }
            let mut roots = RootCertStore::empty();
            for cert in certs {
                roots.add(cert)?;
            }
            Ok(ClientConfig::builder()
                .with_root_certificates(roots)
                .with_no_client_auth())
        }
    }
}

mod danger {
    use rustls::DigitallySignedStruct;
    use rustls::SignatureScheme;
    use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
    use rustls::crypto::CryptoProvider;
    use rustls::pki_types::{CertificateDer, ServerName, UnixTime};

    /// Accepts any server certificate and ignores the hostname. Handshake
    /// signatures are still verified, so the link is encrypted against a
    /// live peer even though the chain is not validated.
    #[derive(Debug)]
    pub(super) struct AcceptAnyServerCert(pub(super) CryptoProvider);

    impl ServerCertVerifier for AcceptAnyServerCert {
        fn verify_server_cert(
            &self,
            _end_entity: &CertificateDer<'_>,
            _intermediates: &[CertificateDer<'_>],
            _server_name: &ServerName<'_>,
            _ocsp_response: &[u8],
            _now: UnixTime,
        ) -> std::result::Result<ServerCertVerified, rustls::Error> {
            Ok(ServerCertVerified::assertion())
        }

        fn verify_tls12_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
            rustls::crypto::verify_tls12_signature(
                message,
                cert,
                dss,
                &self.0.signature_verification_algorithms,
            )
        }

        fn verify_tls13_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
            rustls::crypto::verify_tls13_signature(
                message,
                cert,
                dss,
                &self.0.signature_verification_algorithms,
            )
        }

        fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
            self.0
                .signature_verification_algorithms
                .supported_schemes()
        }
    }
}

impl AsyncRead for ApiStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(s) => Pin::new(s).poll_read(cx, buf),
            Self::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for ApiStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Tcp(s) => Pin::new(s).poll_write(cx, buf),
            Self::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(s) => Pin::new(s).poll_flush(cx),
            Self::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Tcp(s) => Pin::new(s).poll_shutdown(cx),
            Self::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}
