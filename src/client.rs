//! Asynchronous client — connect + login handshake and the request
//! verbs.
//!
//! The protocol has no request identifiers, so a connection supports
//! exactly one exchange at a time. Verbs take `&mut self`: the borrow
//! checker is the exclusive lock that serializes the write-then-read
//! sequence.
//!
//! # Cancellation
//!
//! The framed stream is moved out of the client while an exchange is in
//! flight and restored only after the response is fully read. A future
//! dropped mid-exchange (or an exchange failing in I/O) would leave
//! unread response bytes that misalign every later exchange, so the
//! client closes instead: it stays poisoned and every verb returns
//! [`AspikeError::ConnectionPoisoned`] until `connect` is called again.

use std::collections::HashMap;

use futures::{SinkExt, StreamExt};
use log::{debug, trace, warn};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use crate::admin::AdminMessage;
use crate::codec::AspikeCodec;
use crate::error::AspikeError;
use crate::flags::{Info1Flags, Info2Flags, Info3Flags};
use crate::frame::{Body, Frame};
use crate::header::MessageKind;
use crate::message::{Bin, Field, Message, Operation, result_code};
use crate::value::Value;

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// A client bound to a single server connection.
pub struct AspikeClient {
    host: String,
    port: u16,
    user: String,
    password: String,
    use_tls: bool,
    conn: Option<Framed<TcpStream, AspikeCodec>>,
    poisoned: bool,
    session_token: Option<Vec<u8>>,
}

impl AspikeClient {
    /// Create an unconnected client.
    ///
    /// `use_tls` is retained for callers that wrap the connection
    /// themselves; this crate always connects in plaintext.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        use_tls: bool,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            use_tls,
            conn: None,
            poisoned: false,
            session_token: None,
        }
    }

    /// Whether a connection is currently established.
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// The session token retained from the login response, if the
    /// server sent one.
    pub fn session_token(&self) -> Option<&[u8]> {
        self.session_token.as_deref()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Open the TCP connection and perform the login handshake.
    ///
    /// Reconnecting clears a poisoned state.
    pub async fn connect(&mut self) -> Result<(), AspikeError> {
        if self.use_tls {
            warn!("TLS requested but not performed by this client; connecting in plaintext");
        }
        let stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        // Low-latency socket option; best-effort.
        let _ = stream.set_nodelay(true);
        self.conn = Some(Framed::new(stream, AspikeCodec));
        self.poisoned = false;
        debug!("connected to {}:{}", self.host, self.port);
        self.login().await
    }

    /// Drop the connection and any retained session state.
    pub fn close(&mut self) {
        self.conn = None;
        self.poisoned = false;
        self.session_token = None;
    }

    async fn login(&mut self) -> Result<(), AspikeError> {
        let login = AdminMessage::login(&self.user, &self.password)?;
        let response = self.exchange(Frame::admin(login)).await?;
        match response.into_body() {
            Body::Admin(message) => {
                self.session_token = message.session_token().map(|token| token.to_vec());
                debug!(
                    "login complete as {:?} (session token: {})",
                    self.user,
                    if self.session_token.is_some() {
                        "present"
                    } else {
                        "absent"
                    }
                );
                Ok(())
            }
            Body::Message(_) => Err(AspikeError::UnsupportedMessageKind(MessageKind::Message)),
        }
    }

    // ── Exchange driver ──────────────────────────────────────────

    /// Write one frame and read exactly one framed response.
    async fn exchange(&mut self, frame: Frame) -> Result<Frame, AspikeError> {
        if self.poisoned {
            return Err(AspikeError::ConnectionPoisoned);
        }
        let Some(mut conn) = self.conn.take() else {
            return Err(AspikeError::NotConnected);
        };
        // From here until the response is restored below, dropping this
        // future leaves the stream out of the client and the poisoned
        // flag set; see the module docs.
        self.poisoned = true;

        conn.send(frame).await?;
        let response = match conn.next().await {
            Some(result) => result?,
            None => return Err(AspikeError::UnexpectedEof),
        };

        self.conn = Some(conn);
        self.poisoned = false;
        trace!("exchange complete ({:?} response)", response.kind());
        Ok(response)
    }

    /// Exchange an operation message, expecting one back.
    async fn request(&mut self, message: Message) -> Result<Message, AspikeError> {
        let response = self.exchange(Frame::message(message)).await?;
        match response.into_body() {
            Body::Message(message) => Ok(message),
            Body::Admin(_) => Err(AspikeError::UnsupportedMessageKind(MessageKind::Admin)),
        }
    }

    // ── Verbs ────────────────────────────────────────────────────

    /// Write bins to the record addressed by `key`. A `ttl` of 0 keeps
    /// the server's default expiration.
    pub async fn put(
        &mut self,
        namespace: &str,
        set_name: &str,
        key: impl Into<Value>,
        bins: Vec<Bin>,
        ttl: u32,
    ) -> Result<(), AspikeError> {
        let message = Message::put(namespace, set_name, &key.into(), bins, ttl)?;
        let response = self.request(message).await?;
        match response.result_code {
            result_code::OK => Ok(()),
            code => Err(server_error("put", code)),
        }
    }

    /// Read every populated bin of the record addressed by `key`.
    /// A missing record yields an empty map.
    pub async fn get(
        &mut self,
        namespace: &str,
        set_name: &str,
        key: impl Into<Value>,
    ) -> Result<HashMap<String, Value>, AspikeError> {
        let message = Message::get(namespace, set_name, &key.into())?;
        let response = self.request(message).await?;
        match response.result_code {
            result_code::OK => Ok(response
                .operations
                .into_iter()
                .map(|op| (op.bin.name, op.bin.value))
                .collect()),
            result_code::KEY_NOT_FOUND => Ok(HashMap::new()),
            code => Err(server_error("get", code)),
        }
    }

    /// Delete the record addressed by `key`.
    pub async fn delete(
        &mut self,
        namespace: &str,
        set_name: &str,
        key: impl Into<Value>,
    ) -> Result<(), AspikeError> {
        let message = Message::delete(namespace, set_name, &key.into())?;
        let response = self.request(message).await?;
        match response.result_code {
            result_code::OK => Ok(()),
            code => Err(server_error("delete", code)),
        }
    }

    /// Whether a record exists under `key`.
    pub async fn exists(
        &mut self,
        namespace: &str,
        set_name: &str,
        key: impl Into<Value>,
    ) -> Result<bool, AspikeError> {
        let message = Message::exists(namespace, set_name, &key.into())?;
        let response = self.request(message).await?;
        match response.result_code {
            result_code::OK => Ok(true),
            result_code::KEY_NOT_FOUND => Ok(false),
            code => Err(server_error("exists", code)),
        }
    }

    /// Compose arbitrary per-bin operations under caller-chosen info
    /// flags and return the parsed response message.
    #[allow(clippy::too_many_arguments)]
    pub async fn operate(
        &mut self,
        namespace: &str,
        set_name: &str,
        key: impl Into<Value>,
        info1: Info1Flags,
        info2: Info2Flags,
        info3: Info3Flags,
        operations: Vec<Operation>,
        extra_fields: Vec<Field>,
        ttl: u32,
        generation: u32,
    ) -> Result<Message, AspikeError> {
        let message = Message::operate(
            namespace,
            set_name,
            &key.into(),
            info1,
            info2,
            info3,
            operations,
            extra_fields,
            ttl,
            generation,
        )?;
        let response = self.request(message).await?;
        match response.result_code {
            result_code::OK => Ok(response),
            code => Err(server_error("operate", code)),
        }
    }
}

fn server_error(verb: &str, code: u8) -> AspikeError {
    warn!("{verb} failed with result code {code}");
    AspikeError::ServerError(code)
}

impl std::fmt::Debug for AspikeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AspikeClient")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("use_tls", &self.use_tls)
            .field("connected", &self.conn.is_some())
            .field("poisoned", &self.poisoned)
            .finish()
    }
}
