//! Per-connection protocol state machine.

use std::sync::Arc;

use accounts::AccountError;
use bytes::BytesMut;
use cipher::CipherPair;
use protocol::handshake::{HandshakeDecoder, HandshakeResponseEncoder};
use protocol::js5::{Js5Decoder, Js5ResponseEncoder};
use protocol::login::{LoginDecoder, LoginResponseEncoder};
use protocol::{
    ClientMessage, Decoder, Encoder, GameMessage, GamePacketDecoder, GamePacketEncoder,
    HandshakeRequest, HandshakeResponse, Js5Request, Js5Response, Js5Status, LoginRequest,
    LoginResponse, LoginStatus, ProtocolError, Request,
};
use session::{ConnectionHandle, Phase, SessionId};
use tokio::sync::oneshot;

use crate::channels::NetToTick;
use crate::error::NetError;
use crate::server::NetContext;

/// Decoder for whatever the current phase expects.
#[derive(Debug)]
enum Pipeline {
    Handshake(HandshakeDecoder),
    Js5(Js5Decoder),
    Login(LoginDecoder),
    Game(GamePacketDecoder),
}

impl Pipeline {
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Request>, ProtocolError> {
        Ok(match self {
            Pipeline::Handshake(d) => d.decode(src)?.map(Request::Handshake),
            Pipeline::Js5(d) => d.decode(src)?.map(Request::Js5),
            Pipeline::Login(d) => d.decode(src)?.map(Request::Login),
            Pipeline::Game(d) => d.decode(src)?.map(Request::Game),
        })
    }
}

/// What the read loop does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

pub struct Connection {
    id: SessionId,
    phase: Phase,
    pipeline: Pipeline,
    handle: ConnectionHandle,
    ctx: Arc<NetContext>,
    attached: bool,
    js5_key: u8,
}

impl Connection {
    pub fn new(handle: ConnectionHandle, ctx: Arc<NetContext>) -> Self {
        Self {
            id: handle.session_id(),
            phase: Phase::Handshake,
            pipeline: Pipeline::Handshake(HandshakeDecoder),
            handle,
            ctx,
            attached: false,
            js5_key: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// True once a player owns this connection on the tick thread.
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn on_connect(&mut self) {
        self.phase = Phase::Handshake;
        self.pipeline = Pipeline::Handshake(HandshakeDecoder);
        tracing::debug!(session_id = %self.id, "awaiting handshake");
    }

    /// Decodes and handles every complete request in `src`.
    pub async fn on_bytes(&mut self, src: &mut BytesMut) -> Result<Flow, NetError> {
        while let Some(request) = self.pipeline.decode(src)? {
            if self.on_message_received(request).await? == Flow::Close {
                return Ok(Flow::Close);
            }
        }
        Ok(Flow::Continue)
    }

    pub async fn on_message_received(&mut self, request: Request) -> Result<Flow, NetError> {
        match request {
            Request::Handshake(req) => self.on_handshake(req),
            Request::Js5(req) => self.on_js5(req),
            Request::Login(req) => self.on_login(req).await,
            Request::Game(msg) => self.on_game(msg),
        }
    }

    pub fn on_error(&self, err: &NetError) {
        if err.is_benign() {
            tracing::debug!(session_id = %self.id, phase = ?self.phase, error = %err, "connection dropped");
        } else if let NetError::Protocol(_) = err {
            tracing::debug!(session_id = %self.id, phase = ?self.phase, error = %err, "closing on protocol violation");
        } else {
            tracing::warn!(session_id = %self.id, phase = ?self.phase, error = %err, "connection error");
        }
    }

    /// Tells the tick thread the player is gone, if there is one.
    pub fn on_disconnect(&mut self) {
        if std::mem::take(&mut self.attached) {
            let _ = self.ctx.player_tx.send(NetToTick::Disconnected {
                session_id: self.id,
            });
        }
        tracing::debug!(session_id = %self.id, phase = ?self.phase, "connection closed");
    }

    fn on_handshake(&mut self, req: HandshakeRequest) -> Result<Flow, NetError> {
        match req {
            HandshakeRequest::Js5 { revision } => {
                if revision != self.ctx.revision {
                    tracing::debug!(session_id = %self.id, revision, expected = self.ctx.revision, "js5 client out of date");
                    self.send(HandshakeResponseEncoder, HandshakeResponse::Js5(Js5Status::OutOfDate))?;
                    return Ok(Flow::Close);
                }
                self.phase.advance(Phase::AssetRequest)?;
                self.pipeline = Pipeline::Js5(Js5Decoder);
                self.send(HandshakeResponseEncoder, HandshakeResponse::Js5(Js5Status::Ok))?;
            }
            HandshakeRequest::Login => {
                self.phase.advance(Phase::Login)?;
                self.pipeline = Pipeline::Login(LoginDecoder);
                self.send(
                    HandshakeResponseEncoder,
                    HandshakeResponse::Login {
                        server_key: self.id.0,
                    },
                )?;
            }
        }
        Ok(Flow::Continue)
    }

    fn on_js5(&mut self, req: Js5Request) -> Result<Flow, NetError> {
        match req {
            Js5Request::File {
                index,
                archive,
                priority,
            } => match self.ctx.assets.container(index, archive) {
                Some(container) => {
                    let mut buf = BytesMut::new();
                    Js5ResponseEncoder.encode(
                        Js5Response {
                            index,
                            archive,
                            priority,
                            container,
                        },
                        &mut buf,
                    )?;
                    if self.js5_key != 0 {
                        buf.iter_mut().for_each(|b| *b ^= self.js5_key);
                    }
                    self.handle.send(buf.freeze());
                }
                None => {
                    tracing::debug!(session_id = %self.id, index, archive, "requested container not found");
                }
            },
            Js5Request::EncryptionKey(key) => self.js5_key = key,
            Js5Request::Close => return Ok(Flow::Close),
            Js5Request::LoggedIn | Js5Request::LoggedOut | Js5Request::Init => {
                tracing::trace!(session_id = %self.id, ?req, "js5 notice");
            }
            Js5Request::Unknown(opcode) => {
                tracing::trace!(session_id = %self.id, opcode, "ignoring unknown js5 opcode");
            }
        }
        Ok(Flow::Continue)
    }

    /// Session checks and credentials are settled here. The tick thread only
    /// sees a login once the password has been verified.
    async fn on_login(&mut self, request: LoginRequest) -> Result<Flow, NetError> {
        tracing::debug!(session_id = %self.id, username = %request.username, "login block received");
        if request.revision != self.ctx.revision {
            tracing::debug!(session_id = %self.id, revision = request.revision, expected = self.ctx.revision, "client out of date");
            return self.reject(LoginStatus::GameUpdated);
        }
        if request.server_key != self.id.0 {
            return self.reject(LoginStatus::BadSessionId);
        }

        let accounts = self.ctx.accounts.clone();
        let LoginRequest {
            username,
            password,
            seed,
            ..
        } = request;
        let verified =
            tokio::task::spawn_blocking(move || accounts.authenticate(&username, &password)).await;
        let profile = match verified {
            Ok(Ok(profile)) => profile,
            Ok(Err(e)) => {
                tracing::debug!(session_id = %self.id, error = %e, "credentials refused");
                return self.reject(credential_status(&e));
            }
            Err(e) => {
                tracing::warn!(session_id = %self.id, error = %e, "credential check aborted");
                return self.reject(LoginStatus::CouldNotComplete);
            }
        };

        let ciphers = CipherPair::server(seed);
        let (reply, response) = oneshot::channel();
        let event = NetToTick::Login {
            profile,
            handle: self.handle.clone(),
            encoder: GamePacketEncoder::new(ciphers.encoder),
            reply,
        };
        if self.ctx.player_tx.send(event).is_err() {
            self.reject_unavailable()?;
            return Err(NetError::TickUnavailable);
        }

        match response.await {
            Ok(LoginResponse::Accepted { index, .. }) => {
                self.phase.advance(Phase::Authenticated)?;
                self.pipeline = Pipeline::Game(GamePacketDecoder::new(ciphers.decoder));
                self.attached = true;
                tracing::debug!(session_id = %self.id, index, "authenticated");
                Ok(Flow::Continue)
            }
            Ok(LoginResponse::Rejected(status)) => {
                tracing::debug!(session_id = %self.id, ?status, "login rejected");
                Ok(Flow::Close)
            }
            Err(_) => {
                self.reject_unavailable()?;
                Err(NetError::TickUnavailable)
            }
        }
    }

    fn reject(&self, status: LoginStatus) -> Result<Flow, NetError> {
        self.send(LoginResponseEncoder, LoginResponse::Rejected(status))?;
        Ok(Flow::Close)
    }

    fn reject_unavailable(&self) -> Result<(), NetError> {
        self.reject(LoginStatus::CouldNotComplete).map(drop)
    }

    fn on_game(&mut self, msg: GameMessage) -> Result<Flow, NetError> {
        match ClientMessage::decode(&msg)? {
            ClientMessage::Unknown { opcode } => {
                tracing::trace!(session_id = %self.id, opcode, len = msg.payload.len(), "ignoring unknown opcode");
            }
            message => {
                let event = NetToTick::Message {
                    session_id: self.id,
                    message,
                };
                if self.ctx.player_tx.send(event).is_err() {
                    return Err(NetError::TickUnavailable);
                }
            }
        }
        Ok(Flow::Continue)
    }

    fn send<E: Encoder<T>, T>(&self, mut encoder: E, item: T) -> Result<(), NetError> {
        let mut buf = BytesMut::new();
        encoder.encode(item, &mut buf)?;
        self.handle.send(buf.freeze());
        Ok(())
    }
}

fn credential_status(err: &AccountError) -> LoginStatus {
    match err {
        AccountError::InvalidUsername(_) | AccountError::InvalidPassword => {
            LoginStatus::InvalidCredentials
        }
        AccountError::HashError(_) => LoginStatus::CouldNotComplete,
    }
}
