//! STOMP 1.2 bus adapter.
//!
//! Talks to an ActiveMQ-style broker over plain TCP.  Every subscription
//! owns a dedicated connection; every publish opens a short-lived one.
//!
//! ```text
//!   subscribe:  CONNECT ─▶ CONNECTED ─▶ SUBSCRIBE ─▶ MESSAGE* ─▶ UNSUBSCRIBE, DISCONNECT
//!   publish:    CONNECT ─▶ CONNECTED ─▶ SEND ─▶ DISCONNECT(receipt) ─▶ RECEIPT
//! ```
//!
//! Message kinds follow the ActiveMQ convention: a `MESSAGE` carrying a
//! `content-length` header is a bytes message, one without is a text
//! message.

pub mod frame;

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use log::{debug, info};

use crate::app::ports::{BusClient, BusMessage, Interrupter, Subscription};
use crate::config::BrokerConfig;
use crate::error::BusError;

use self::frame::{Frame, FrameDecoder, FrameError};

const READ_BUF_SIZE: usize = 1024;

/// Connect, handshake and receipt timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Single subscription per connection, so the id is fixed.
const SUBSCRIPTION_ID: &str = "0";

impl From<FrameError> for BusError {
    fn from(e: FrameError) -> Self {
        Self::Protocol(e.as_str())
    }
}

/// Broker destination for a bare topic name.
pub fn destination(topic: &str) -> String {
    format!("/topic/{topic}")
}

pub struct StompBus {
    config: BrokerConfig,
    timeout: Duration,
    next_receipt: AtomicU64,
}

impl StompBus {
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            config,
            timeout: DEFAULT_TIMEOUT,
            next_receipt: AtomicU64::new(1),
        }
    }
}

impl BusClient for StompBus {
    type Subscription = StompSubscription;

    fn subscribe(&self, topic: &str) -> Result<StompSubscription, BusError> {
        let mut conn = Connection::open(&self.config, self.timeout)?;
        conn.send(
            &Frame::new("SUBSCRIBE")
                .header("id", SUBSCRIPTION_ID)
                .header("destination", &destination(topic))
                .header("ack", "auto"),
        )?;
        // Readings may be minutes apart; block indefinitely from here on.
        conn.stream.set_read_timeout(None)?;
        let control = Arc::new(conn.stream.try_clone()?);
        info!(
            "STOMP: subscribed to {} on {}:{}",
            destination(topic),
            self.config.host,
            self.config.port
        );
        Ok(StompSubscription {
            topic: topic.to_owned(),
            conn,
            control,
        })
    }

    fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError> {
        let mut conn = Connection::open(&self.config, self.timeout)?;
        conn.send(
            &Frame::new("SEND")
                .header("destination", &destination(topic))
                .header("content-type", "text/plain")
                .body(payload),
        )?;

        let receipt = self.next_receipt.fetch_add(1, Ordering::Relaxed).to_string();
        conn.send(&Frame::new("DISCONNECT").header("receipt", &receipt))?;
        loop {
            let frame = conn.read_frame()?;
            match frame.command.as_str() {
                "RECEIPT" if frame.get("receipt-id") == Some(receipt.as_str()) => break,
                "ERROR" => return Err(broker_error(&frame)),
                other => debug!("STOMP: ignoring {} while awaiting receipt", other),
            }
        }
        debug!("STOMP: sent '{}' to {}", payload, destination(topic));
        Ok(())
    }
}

pub struct StompSubscription {
    topic: String,
    conn: Connection,
    /// Second handle on the socket, used to unblock a pending read.
    control: Arc<TcpStream>,
}

impl Subscription for StompSubscription {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn recv(&mut self) -> Result<Option<BusMessage>, BusError> {
        let frame = self.conn.read_frame()?;
        classify(frame).map(Some)
    }

    fn interrupter(&self) -> Interrupter {
        let control = self.control.clone();
        Interrupter::new(move || {
            let _ = control.shutdown(Shutdown::Both);
        })
    }

    fn close(mut self) -> Result<(), BusError> {
        self.conn
            .send(&Frame::new("UNSUBSCRIBE").header("id", SUBSCRIPTION_ID))?;
        self.conn.send(&Frame::new("DISCONNECT"))?;
        let _ = self.control.shutdown(Shutdown::Both);
        Ok(())
    }
}

/// Map a server frame on a subscription to a bus message.
pub fn classify(frame: Frame) -> Result<BusMessage, BusError> {
    match frame.command.as_str() {
        "MESSAGE" if frame.get("content-length").is_some() => Ok(BusMessage::Binary(frame.body)),
        "MESSAGE" => Ok(BusMessage::Text(
            String::from_utf8_lossy(&frame.body).into_owned(),
        )),
        "ERROR" => Err(broker_error(&frame)),
        _ => Ok(BusMessage::Other {
            kind: frame.command,
        }),
    }
}

fn broker_error(frame: &Frame) -> BusError {
    let message = match frame.get("message") {
        Some(m) => m.to_owned(),
        None => String::from_utf8_lossy(&frame.body).trim().to_owned(),
    };
    BusError::Broker(message)
}

struct Connection {
    stream: TcpStream,
    decoder: FrameDecoder,
    buf: [u8; READ_BUF_SIZE],
}

impl Connection {
    fn open(config: &BrokerConfig, timeout: Duration) -> Result<Self, BusError> {
        let addr = (config.host.as_str(), config.port)
            .to_socket_addrs()?
            .next()
            .ok_or(BusError::Protocol("broker address did not resolve"))?;
        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;

        let mut conn = Self {
            stream,
            decoder: FrameDecoder::new(),
            buf: [0; READ_BUF_SIZE],
        };

        let mut connect = Frame::new("CONNECT")
            .header("accept-version", "1.2")
            .header("host", &config.host)
            .header("heart-beat", "0,0");
        if let Some(login) = &config.login {
            connect = connect.header("login", login);
        }
        if let Some(passcode) = &config.passcode {
            connect = connect.header("passcode", passcode);
        }
        conn.send(&connect)?;

        let reply = conn.read_frame()?;
        match reply.command.as_str() {
            "CONNECTED" => Ok(conn),
            "ERROR" => Err(broker_error(&reply)),
            _ => Err(BusError::Protocol("expected CONNECTED")),
        }
    }

    fn send(&mut self, frame: &Frame) -> Result<(), BusError> {
        self.stream.write_all(&frame.encode())?;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Frame, BusError> {
        loop {
            if let Some(frame) = self.decoder.next_frame()? {
                return Ok(frame);
            }
            let n = self.stream.read(&mut self.buf)?;
            if n == 0 {
                return Err(BusError::Closed);
            }
            self.decoder.feed(&self.buf[..n]);
        }
    }
}
