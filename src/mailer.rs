//! SMTP delivery of the digest.
//!
//! The mailer opens one implicit-TLS connection per send (port 465 style),
//! authenticates with `AUTH LOGIN`, submits a single message to a single
//! recipient and closes the session. There is no retry: any failure is
//! returned to the caller and ends the run.
//!
//! # Session
//!
//! ```text
//! S: 220 greeting
//! C: EHLO <hostname>         S: 250
//! C: AUTH LOGIN              S: 334
//! C: <base64 user>           S: 334
//! C: <base64 password>       S: 235
//! C: MAIL FROM:<sender>      S: 250
//! C: RCPT TO:<recipient>     S: 250
//! C: DATA                    S: 354
//! C: <message> CRLF . CRLF   S: 250
//! C: QUIT                    S: 221
//! ```
//!
//! `QUIT` is sent on every exit path once the greeting has been read; the
//! connection itself is owned by [`SmtpMailer::send`] and dropped when it
//! returns.

use crate::config::MailConfig;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use rand::{Rng, rng};
use std::io;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio_native_tls::TlsConnector;
use tracing::{debug, info, instrument, trace, warn};

/// Errors raised while delivering the digest.
#[derive(Debug, Error)]
pub enum MailError {
    /// TCP connection to the SMTP server failed.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        /// `host:port` that was dialled.
        addr: String,
        /// Underlying socket error.
        source: io::Error,
    },

    /// TLS setup or handshake failed.
    #[error("TLS handshake failed: {0}")]
    Tls(#[from] native_tls::Error),

    /// Reading from or writing to the session failed.
    #[error("SMTP I/O error: {0}")]
    Io(#[from] io::Error),

    /// The server closed the connection mid-session.
    #[error("SMTP server closed the connection")]
    Closed,

    /// The server rejected the credentials.
    #[error("SMTP authentication failed: {0}")]
    Auth(String),

    /// The server answered with an unexpected reply code.
    #[error("expected SMTP {expected}, got: {response}")]
    Protocol {
        /// Reply code that was required.
        expected: &'static str,
        /// Full server reply.
        response: String,
    },
}

/// Trait for anything that can deliver a digest.
pub trait Mailer {
    /// Send one HTML message with the given subject.
    async fn send(&self, subject: &str, html_body: &str) -> Result<(), MailError>;
}

/// Mailer that submits over SMTP with implicit TLS.
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    config: MailConfig,
}

impl SmtpMailer {
    /// Creates a mailer for the given account and server.
    pub const fn new(config: MailConfig) -> Self {
        Self { config }
    }

    fn message_id(&self, now: DateTime<Utc>) -> String {
        let nonce: u64 = rng().random();
        format!(
            "<{}.{nonce:016x}@{}>",
            now.timestamp_millis(),
            extract_domain(&self.config.sender)
        )
    }
}

impl Mailer for SmtpMailer {
    #[instrument(level = "info", skip_all, fields(host = %self.config.host, port = self.config.port))]
    async fn send(&self, subject: &str, html_body: &str) -> Result<(), MailError> {
        let now = Utc::now();
        let boundary = format!("=_digest_{:032x}", rng().random::<u128>());
        let message = compose_message(
            &self.config.sender,
            &self.config.recipient,
            subject,
            html_body,
            now,
            &self.message_id(now),
            &boundary,
        );

        let addr = format!("{}:{}", self.config.host, self.config.port);
        let tcp = TcpStream::connect(&addr)
            .await
            .map_err(|source| MailError::Connect { addr: addr.clone(), source })?;
        let connector = TlsConnector::from(native_tls::TlsConnector::new()?);
        let tls = connector.connect(&self.config.host, tcp).await?;
        debug!(%addr, "TLS session established");

        let envelope = Envelope {
            login: &self.config.sender,
            password: &self.config.password,
            from: &self.config.sender,
            to: &self.config.recipient,
            message: &message,
        };
        deliver(tls, &envelope).await?;

        info!(bytes = message.len(), "Digest email accepted by SMTP server");
        Ok(())
    }
}

/// Everything one SMTP transaction needs.
struct Envelope<'a> {
    login: &'a str,
    password: &'a str,
    from: &'a str,
    to: &'a str,
    message: &'a str,
}

/// Run a full session over an already-encrypted stream, always ending with `QUIT`.
async fn deliver<S>(stream: S, envelope: &Envelope<'_>) -> Result<(), MailError>
where
    S: AsyncRead + AsyncWrite,
{
    let mut session = SmtpSession::new(stream);
    session.expect("220").await?;

    let outcome = session.transact(envelope).await;
    session.quit().await;
    outcome
}

/// Line-oriented SMTP client over any async stream.
struct SmtpSession<S> {
    reader: BufReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
}

impl<S> SmtpSession<S>
where
    S: AsyncRead + AsyncWrite,
{
    fn new(stream: S) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    async fn transact(&mut self, envelope: &Envelope<'_>) -> Result<(), MailError> {
        let hostname = hostname::get().map_or_else(
            |_| "localhost".to_string(),
            |h| h.to_string_lossy().to_string(),
        );
        self.command(&format!("EHLO {hostname}")).await?;
        self.expect("250").await?;

        self.command("AUTH LOGIN").await?;
        self.expect("334").await?;
        self.command(&STANDARD.encode(envelope.login)).await?;
        self.expect("334").await?;
        self.command(&STANDARD.encode(envelope.password)).await?;
        let auth = self.read_response().await?;
        if !auth.starts_with("235") {
            warn!(response = %auth.trim_end(), "SMTP server rejected credentials");
            return Err(MailError::Auth(auth.trim_end().to_string()));
        }

        self.command(&format!("MAIL FROM:<{}>", envelope.from)).await?;
        self.expect("250").await?;
        self.command(&format!("RCPT TO:<{}>", envelope.to)).await?;
        self.expect("250").await?;

        self.command("DATA").await?;
        self.expect("354").await?;
        let stuffed = envelope.message.replace("\r\n.", "\r\n..");
        self.writer.write_all(stuffed.as_bytes()).await?;
        let terminator: &[u8] = if stuffed.ends_with("\r\n") { b".\r\n" } else { b"\r\n.\r\n" };
        self.writer.write_all(terminator).await?;
        self.writer.flush().await?;
        self.expect("250").await
    }

    /// Best-effort `QUIT`; the server may hang up before answering.
    async fn quit(&mut self) {
        if self.command("QUIT").await.is_ok() {
            let _ = self.read_response().await;
        }
        let _ = self.writer.shutdown().await;
    }

    async fn command(&mut self, line: &str) -> Result<(), MailError> {
        trace!(command = %line.split(' ').next().unwrap_or(line), "Sending SMTP command");
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Read one possibly multi-line reply (`250-...` continuation lines).
    async fn read_response(&mut self) -> Result<String, MailError> {
        let mut response = String::new();
        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line).await? == 0 {
                return Err(MailError::Closed);
            }
            trace!(line = %line.trim_end(), "SMTP response");
            response.push_str(&line);
            if line.len() < 4 || line.as_bytes()[3] != b'-' {
                break;
            }
        }
        Ok(response)
    }

    async fn expect(&mut self, code: &'static str) -> Result<(), MailError> {
        let response = self.read_response().await?;
        if response.starts_with(code) {
            Ok(())
        } else {
            Err(MailError::Protocol {
                expected: code,
                response: response.trim_end().to_string(),
            })
        }
    }
}

/// Build an RFC 5322 message with one base64 `text/html` part.
pub fn compose_message(
    from: &str,
    to: &str,
    subject: &str,
    html_body: &str,
    date: DateTime<Utc>,
    message_id: &str,
    boundary: &str,
) -> String {
    let mut message = format!(
        "From: {from}\r\n\
         To: {to}\r\n\
         Subject: {}\r\n\
         Date: {}\r\n\
         Message-ID: {message_id}\r\n\
         MIME-Version: 1.0\r\n\
         Content-Type: multipart/mixed; boundary=\"{boundary}\"\r\n\
         \r\n\
         --{boundary}\r\n\
         Content-Type: text/html; charset=utf-8\r\n\
         Content-Transfer-Encoding: base64\r\n\
         \r\n",
        encode_header(subject),
        date.to_rfc2822(),
    );

    let encoded = STANDARD.encode(html_body);
    for chunk in encoded.as_bytes().chunks(76) {
        // base64 output is ASCII
        message.push_str(std::str::from_utf8(chunk).unwrap_or_default());
        message.push_str("\r\n");
    }
    message.push_str(&format!("--{boundary}--\r\n"));
    message
}

/// RFC 2047 encode a header value when it is not plain ASCII.
pub fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?utf-8?B?{}?=", STANDARD.encode(value))
    }
}

fn extract_domain(email: &str) -> &str {
    email.split('@').nth(1).unwrap_or("localhost")
}
