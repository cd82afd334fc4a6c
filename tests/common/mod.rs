//! In-process mock RethinkDB server for integration tests
//!
//! Speaks the server side of the V1_0 handshake, SCRAM-SHA-256 included, on a real TCP
//! socket. Runs on its own thread and runtime so blocking clients can use it too.

#![allow(dead_code)]

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

type HmacSha256 = Hmac<Sha256>;

const MAGIC_V1_0: u32 = 0x34c2_bdc3;
const SALT: &[u8] = b"reql-wire-mock-salt";
const ITERATIONS: u32 = 1024;

pub const SERVER_VERSION: &str = "2.4.4-mock";

/// How the server answers each connection
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Complete the handshake for these credentials, reject anything else
    Accept { user: String, password: String },
    /// Accept the socket, never answer
    Silent,
    /// Accept any proof but answer with a bogus server signature
    ForgeSignature,
}

impl Behavior {
    pub fn accept(user: &str, password: &str) -> Self {
        Behavior::Accept {
            user: user.to_string(),
            password: password.to_string(),
        }
    }
}

struct OpenGuard(Arc<AtomicUsize>);

impl OpenGuard {
    fn new(open: Arc<AtomicUsize>) -> Self {
        open.fetch_add(1, Ordering::SeqCst);
        Self(open)
    }
}

impl Drop for OpenGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct MockServer {
    port: u16,
    open: Arc<AtomicUsize>,
    accepted: Arc<AtomicUsize>,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl MockServer {
    pub fn start(behavior: Behavior) -> Self {
        let std_listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        std_listener.set_nonblocking(true).expect("set_nonblocking");
        let port = std_listener.local_addr().expect("local_addr").port();

        let open = Arc::new(AtomicUsize::new(0));
        let accepted = Arc::new(AtomicUsize::new(0));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let thread = std::thread::spawn({
            let open = open.clone();
            let accepted = accepted.clone();
            move || {
                let runtime = tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(2)
                    .enable_all()
                    .build()
                    .expect("mock server runtime");

                runtime.block_on(async move {
                    let listener = TcpListener::from_std(std_listener).expect("from_std");
                    loop {
                        tokio::select! {
                            _ = &mut shutdown_rx => break,
                            accept = listener.accept() => {
                                let Ok((socket, _)) = accept else { continue };
                                accepted.fetch_add(1, Ordering::SeqCst);
                                let guard = OpenGuard::new(open.clone());
                                let behavior = behavior.clone();
                                tokio::spawn(async move {
                                    let _guard = guard;
                                    let _ = serve(socket, behavior).await;
                                });
                            }
                        }
                    }
                });
            }
        });

        Self {
            port,
            open,
            accepted,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Sockets currently open on the server side
    pub fn open_connections(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    /// Sockets accepted since start
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Wait until the open socket count reaches `n`
    pub fn wait_for_open(&self, n: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.open_connections() == n {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        self.open_connections() == n
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

async fn serve(mut socket: TcpStream, behavior: Behavior) -> io::Result<()> {
    let mut magic = [0u8; 4];
    socket.read_exact(&mut magic).await?;
    if u32::from_le_bytes(magic) != MAGIC_V1_0 {
        socket
            .write_all(b"ERROR: Received an unsupported protocol version.\0")
            .await?;
        return Ok(());
    }

    if matches!(behavior, Behavior::Silent) {
        drain(&mut socket).await;
        return Ok(());
    }

    let mut buf = Vec::new();
    let hello = read_frame(&mut socket, &mut buf).await?;
    let client_first = hello["authentication"].as_str().unwrap_or_default();
    let client_first_bare = client_first
        .strip_prefix("n,,")
        .unwrap_or(client_first)
        .to_string();
    let user = attribute(&client_first_bare, "n=").to_string();
    let client_nonce = attribute(&client_first_bare, "r=").to_string();

    write_frame(
        &mut socket,
        json!({
            "success": true,
            "min_protocol_version": 0,
            "max_protocol_version": 0,
            "server_version": SERVER_VERSION,
        }),
    )
    .await?;

    let server_first = format!(
        "r={}mockservernonce,s={},i={}",
        client_nonce,
        BASE64.encode(SALT),
        ITERATIONS
    );
    write_frame(
        &mut socket,
        json!({"success": true, "authentication": server_first}),
    )
    .await?;

    let reply = read_frame(&mut socket, &mut buf).await?;
    let client_final = reply["authentication"].as_str().unwrap_or_default();
    let (without_proof, proof) = client_final.rsplit_once(",p=").unwrap_or((client_final, ""));
    let auth_message = format!("{},{},{}", client_first_bare, server_first, without_proof);

    let answer = match behavior {
        Behavior::Accept {
            user: expected_user,
            password,
        } => {
            let salted = salt_password(&password);
            if user != escape(&expected_user) || !proof_matches(&salted, &auth_message, proof) {
                json!({"success": false, "error": "Wrong password or username", "error_code": 12})
            } else {
                let server_key = hmac(&salted, b"Server Key");
                let signature = hmac(&server_key, auth_message.as_bytes());
                json!({"success": true, "authentication": format!("v={}", BASE64.encode(signature))})
            }
        }
        Behavior::ForgeSignature => {
            json!({"success": true, "authentication": format!("v={}", BASE64.encode([7u8; 32]))})
        }
        Behavior::Silent => unreachable!(),
    };
    write_frame(&mut socket, answer).await?;

    // Hold the socket until the client closes it
    drain(&mut socket).await;
    Ok(())
}

async fn drain(socket: &mut TcpStream) {
    let mut chunk = [0u8; 1024];
    while let Ok(n) = socket.read(&mut chunk).await {
        if n == 0 {
            break;
        }
    }
}

async fn read_frame(socket: &mut TcpStream, buf: &mut Vec<u8>) -> io::Result<Value> {
    loop {
        if let Some(pos) = buf.iter().position(|b| *b == 0) {
            let frame: Vec<u8> = buf.drain(..=pos).collect();
            return serde_json::from_slice(&frame[..pos])
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e));
        }
        let mut chunk = [0u8; 1024];
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

async fn write_frame(socket: &mut TcpStream, value: Value) -> io::Result<()> {
    let mut bytes = serde_json::to_vec(&value)?;
    bytes.push(0);
    socket.write_all(&bytes).await
}

fn attribute<'a>(message: &'a str, prefix: &str) -> &'a str {
    message
        .split(',')
        .find_map(|part| part.strip_prefix(prefix))
        .unwrap_or_default()
}

fn escape(user: &str) -> String {
    user.replace('=', "=3D").replace(',', "=2C")
}

fn salt_password(password: &str) -> Vec<u8> {
    let mut salted = vec![0u8; 32];
    pbkdf2::pbkdf2::<HmacSha256>(password.as_bytes(), SALT, ITERATIONS, &mut salted)
        .expect("pbkdf2 output length");
    salted
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("hmac key");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Recover ClientKey from the proof and check it against StoredKey
fn proof_matches(salted: &[u8], auth_message: &str, proof: &str) -> bool {
    let Ok(proof) = BASE64.decode(proof) else {
        return false;
    };
    let stored_key = Sha256::digest(hmac(salted, b"Client Key"));
    let signature = hmac(&stored_key, auth_message.as_bytes());
    if proof.len() != signature.len() {
        return false;
    }
    let client_key: Vec<u8> = proof.iter().zip(&signature).map(|(p, s)| p ^ s).collect();
    Sha256::digest(client_key) == stored_key
}
