//! In-process HTTP/1.1 test doubles, plain and over TLS.

#![allow(dead_code)]

use boring::asn1::Asn1Time;
use boring::bn::BigNum;
use boring::hash::MessageDigest;
use boring::pkey::{PKey, Private};
use boring::rsa::Rsa;
use boring::ssl::{SslAcceptor, SslMethod};
use boring::x509::extension::{BasicConstraints, SubjectAlternativeName};
use boring::x509::{X509NameBuilder, X509};
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

type Handler = Arc<dyn Fn(&Recorded) -> String + Send + Sync>;

/// One request as seen on the wire.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub head: String,
    pub body: Vec<u8>,
    /// Accept order of the TCP connection that carried the request.
    pub connection: usize,
}

impl Recorded {
    /// First line, e.g. `GET /path HTTP/1.1`.
    pub fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<String> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Read one request (head plus `Content-Length` body). `None` on EOF.
pub async fn read_request<S>(socket: &mut S) -> Option<Recorded>
where
    S: AsyncRead + Unpin,
{
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        match socket.read(&mut byte).await {
            Ok(0) | Err(_) => return None,
            Ok(_) => head.push(byte[0]),
        }
    }

    let mut recorded = Recorded {
        head: String::from_utf8_lossy(&head).into_owned(),
        body: Vec::new(),
        connection: 0,
    };
    let length = recorded
        .header("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    if length > 0 {
        recorded.body = vec![0u8; length];
        socket.read_exact(&mut recorded.body).await.ok()?;
    }
    Some(recorded)
}

/// A `200 OK` response with `body`.
pub fn ok(body: &str) -> String {
    response(200, "OK", &[], body)
}

/// A raw HTTP/1.1 response.
pub fn response(status: u16, reason: &str, headers: &[(&str, &str)], body: &str) -> String {
    let mut out = format!("HTTP/1.1 {} {}\r\n", status, reason);
    for (name, value) in headers {
        out.push_str(&format!("{}: {}\r\n", name, value));
    }
    out.push_str(&format!("Content-Length: {}\r\n\r\n{}", body.len(), body));
    out
}

/// A redirect with an empty body.
pub fn redirect(status: u16, location: &str) -> String {
    response(status, "Redirect", &[("Location", location)], "")
}

/// Answer requests on one connection until the peer closes it.
async fn answer<S>(
    mut socket: S,
    connection: usize,
    handler: Handler,
    tx: mpsc::UnboundedSender<Recorded>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(mut request) = read_request(&mut socket).await {
        request.connection = connection;
        let reply = handler(&request);
        let _ = tx.send(request);
        if socket.write_all(reply.as_bytes()).await.is_err() {
            break;
        }
    }
}

/// Keep-alive server answering every request with `handler`.
///
/// Returns the listening address and a channel of recorded requests.
pub async fn serve<F>(handler: F) -> (SocketAddr, mpsc::UnboundedReceiver<Recorded>)
where
    F: Fn(&Recorded) -> String + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let handler: Handler = Arc::new(handler);

    tokio::spawn(async move {
        let mut accepted = 0;
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(answer(socket, accepted, handler.clone(), tx.clone()));
            accepted += 1;
        }
    });

    (addr, rx)
}

/// Self-signed certificate and key for in-process TLS servers.
///
/// The certificate is its own CA, so a bundle holding it alone verifies it.
pub struct TestIdentity {
    pub cert: X509,
    pub key: PKey<Private>,
}

impl TestIdentity {
    pub fn new(dns_names: &[&str], ips: &[&str]) -> Self {
        let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();

        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_text("CN", dns_names.first().copied().unwrap_or("localhost"))
            .unwrap();
        let name = name.build();

        let mut builder = X509::builder().unwrap();
        builder.set_version(2).unwrap();
        let serial = BigNum::from_u32(1).unwrap().to_asn1_integer().unwrap();
        builder.set_serial_number(&serial).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(&key).unwrap();
        builder
            .set_not_before(&Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::days_from_now(1).unwrap())
            .unwrap();
        builder
            .append_extension(BasicConstraints::new().critical().ca().build().unwrap())
            .unwrap();

        let mut san = SubjectAlternativeName::new();
        for dns in dns_names {
            san.dns(dns);
        }
        for ip in ips {
            san.ip(ip);
        }
        let san = san.build(&builder.x509v3_context(None, None)).unwrap();
        builder.append_extension(san).unwrap();
        builder.sign(&key, MessageDigest::sha256()).unwrap();

        Self {
            cert: builder.build(),
            key,
        }
    }

    /// Certificate for `localhost` and `127.0.0.1`.
    pub fn localhost() -> Self {
        Self::new(&["localhost"], &["127.0.0.1"])
    }

    /// PEM bundle holding the certificate, usable as a CA bundle.
    pub fn ca_bundle(&self) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&self.cert.to_pem().unwrap()).unwrap();
        file.flush().unwrap();
        file
    }

    pub fn acceptor(&self) -> SslAcceptor {
        let mut builder = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls()).unwrap();
        builder.set_certificate(&self.cert).unwrap();
        builder.set_private_key(&self.key).unwrap();
        builder.build()
    }
}

/// Like [`serve`], but every connection starts with a TLS handshake.
///
/// Connections whose handshake fails are dropped.
pub async fn serve_tls<F>(
    identity: &TestIdentity,
    handler: F,
) -> (SocketAddr, mpsc::UnboundedReceiver<Recorded>)
where
    F: Fn(&Recorded) -> String + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let handler: Handler = Arc::new(handler);
    let acceptor = Arc::new(identity.acceptor());

    tokio::spawn(async move {
        let mut accepted = 0;
        while let Ok((socket, _)) = listener.accept().await {
            let connection = accepted;
            accepted += 1;
            let (acceptor, handler, tx) = (acceptor.clone(), handler.clone(), tx.clone());
            tokio::spawn(async move {
                if let Ok(stream) = tokio_boring::accept(&acceptor, socket).await {
                    answer(stream, connection, handler, tx).await;
                }
            });
        }
    });

    (addr, rx)
}

/// HTTP proxy that accepts any `CONNECT` and then terminates TLS itself.
///
/// The `CONNECT` request is recorded first, followed by the tunnelled
/// requests, all tagged with the same connection number.
pub async fn tunnel_proxy<F>(
    identity: &TestIdentity,
    handler: F,
) -> (SocketAddr, mpsc::UnboundedReceiver<Recorded>)
where
    F: Fn(&Recorded) -> String + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    let handler: Handler = Arc::new(handler);
    let acceptor = Arc::new(identity.acceptor());

    tokio::spawn(async move {
        let mut accepted = 0;
        while let Ok((mut socket, _)) = listener.accept().await {
            let connection = accepted;
            accepted += 1;
            let (acceptor, handler, tx) = (acceptor.clone(), handler.clone(), tx.clone());
            tokio::spawn(async move {
                let Some(mut connect) = read_request(&mut socket).await else {
                    return;
                };
                connect.connection = connection;
                let _ = tx.send(connect);
                if socket
                    .write_all(b"HTTP/1.1 200 Connection Established\r\n\r\n")
                    .await
                    .is_err()
                {
                    return;
                }
                if let Ok(stream) = tokio_boring::accept(&acceptor, socket).await {
                    answer(stream, connection, handler, tx).await;
                }
            });
        }
    });

    (addr, rx)
}

/// Server that accepts connections and never answers.
pub async fn silent() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// An address with nothing listening on it.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
