//! Durable queue publisher.
//!
//! Every attempt opens a fresh broker connection, declares the queue durable,
//! publishes with persistent delivery and waits for the broker confirmation.
//! A reading that exhausts its attempts is logged and dropped; nothing is
//! carried over to the next cycle.
//!
//! Each step of an attempt (connect, publish, close) is bounded by the
//! attempt timeout. For plain `amqp://` URLs the TCP socket is opened here so
//! it can be shut down when a step times out; lapin's I/O thread then sees
//! the socket close and exits instead of waiting on a stalled broker.

use std::future::Future;
use std::net::{Shutdown, TcpStream as StdTcpStream};
use std::time::Duration;

use lapin::options::{BasicPublishOptions, ConfirmSelectOptions, QueueDeclareOptions};
use lapin::publisher_confirm::Confirmation;
use lapin::tcp::{HandshakeResult, TcpStream};
use lapin::types::FieldTable;
use lapin::uri::{AMQPScheme, AMQPUri};
use lapin::{BasicProperties, Connection, ConnectionProperties};

use crate::config::Settings;
use crate::error::PublishError;
use crate::reading::Reading;
use crate::retry::{retry, RetryPolicy};

/// AMQP delivery mode for messages that survive a broker restart.
const PERSISTENT: u8 = 2;

/// Bound on each step (connect, publish + confirm, close) of a single attempt.
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Anything that can put a message body on a named durable queue.
pub trait Broker: Send + Sync {
    /// Deliver `payload` to `queue` over a fresh connection.
    fn deliver(
        &self,
        queue: &str,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), PublishError>> + Send;
}

/// RabbitMQ broker reached through lapin.
#[derive(Debug, Clone)]
pub struct AmqpBroker {
    url: String,
    timeout: Duration,
}

impl AmqpBroker {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: ATTEMPT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn bounded<T>(&self, step: impl Future<Output = T>) -> Result<T, PublishError> {
        tokio::time::timeout(self.timeout, step)
            .await
            .map_err(|_| PublishError::Timeout(self.timeout))
    }

    /// Open a connection. Returns the raw socket as well when it was opened
    /// here, so the caller can force it shut.
    async fn connect(
        &self,
        uri: AMQPUri,
    ) -> Result<(Connection, Option<StdTcpStream>), PublishError> {
        if matches!(uri.scheme, AMQPScheme::AMQPS) {
            let connection = self
                .bounded(Connection::connect_uri(uri, ConnectionProperties::default()))
                .await??;
            return Ok((connection, None));
        }

        let stream = self
            .bounded(tokio::net::TcpStream::connect((
                uri.authority.host.as_str(),
                uri.authority.port,
            )))
            .await??
            .into_std()?;
        let socket = stream.try_clone()?;

        let handshake = Connection::connector(
            uri,
            Box::new(move |_: &AMQPUri| -> HandshakeResult { Ok(TcpStream::from_std(stream)?) }),
            ConnectionProperties::default(),
        );
        match self.bounded(handshake).await {
            Ok(Ok(connection)) => Ok((connection, Some(socket))),
            Ok(Err(e)) => {
                shut(&socket);
                Err(e.into())
            }
            Err(e) => {
                shut(&socket);
                Err(e)
            }
        }
    }
}

/// Shut both directions of a socket whose connection is being abandoned.
fn shut(socket: &StdTcpStream) {
    if let Err(e) = socket.shutdown(Shutdown::Both) {
        log::debug!("[Publisher] socket shutdown failed: {}", e);
    }
}

async fn publish_on(
    connection: &Connection,
    queue: &str,
    payload: &[u8],
) -> Result<(), PublishError> {
    let channel = connection.create_channel().await?;
    channel
        .confirm_select(ConfirmSelectOptions::default())
        .await?;
    channel
        .queue_declare(
            queue,
            QueueDeclareOptions {
                durable: true,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await?;

    let confirmation = channel
        .basic_publish(
            "",
            queue,
            BasicPublishOptions::default(),
            payload,
            BasicProperties::default()
                .with_delivery_mode(PERSISTENT)
                .with_content_type("application/json".into()),
        )
        .await?
        .await?;

    match confirmation {
        Confirmation::Nack(_) => Err(PublishError::Nacked),
        _ => Ok(()),
    }
}

impl Broker for AmqpBroker {
    async fn deliver(&self, queue: &str, payload: &[u8]) -> Result<(), PublishError> {
        let uri: AMQPUri = self.url.parse().map_err(PublishError::Broker)?;
        let (connection, socket) = self.connect(uri).await?;

        let result = self
            .bounded(publish_on(&connection, queue, payload))
            .await
            .and_then(|published| published);

        let closed = match self.bounded(connection.close(200, "OK")).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                log::debug!("[Publisher] closing connection failed: {}", e);
                false
            }
            Err(e) => {
                log::debug!("[Publisher] closing connection failed: {}", e);
                false
            }
        };
        if !closed {
            if let Some(socket) = &socket {
                shut(socket);
            }
        }
        result
    }
}

/// Publishes readings to one queue with a bounded retry policy.
pub struct QueuePublisher<B> {
    broker: B,
    queue: String,
    policy: RetryPolicy,
}

impl QueuePublisher<AmqpBroker> {
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            AmqpBroker::new(settings.rabbitmq_url.clone()),
            settings.queue_name.clone(),
            settings.publish_retry.clone(),
        )
    }
}

impl<B: Broker> QueuePublisher<B> {
    pub fn new(broker: B, queue: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            broker,
            queue: queue.into(),
            policy,
        }
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Publish a reading. Never fails: returns whether the broker accepted
    /// it. A reading that exhausts every attempt is dropped.
    pub async fn publish(&self, reading: &Reading) -> bool {
        match self.try_publish(reading).await {
            Ok(()) => {
                log::info!(
                    "[Publisher] published {} reading for {} to '{}'",
                    reading.origin,
                    reading.city,
                    self.queue
                );
                true
            }
            Err(e) => {
                log::error!(
                    "[Publisher] dropping {} reading for {} after {} attempts: {}",
                    reading.origin,
                    reading.city,
                    self.policy.attempts(),
                    e
                );
                false
            }
        }
    }

    /// Serialize once and deliver with retries, returning the last error.
    pub async fn try_publish(&self, reading: &Reading) -> Result<(), PublishError> {
        let payload = reading.to_json()?;
        retry(
            &self.policy,
            "Publisher",
            |_: &PublishError| false,
            |_| self.broker.deliver(&self.queue, &payload),
        )
        .await
    }
}
