//! Broker MQTT sobre `rumqttc` (cliente síncrono).
//!
//! O event loop do `rumqttc` só anda quando a `Connection` é consultada, então
//! `poll()` drena eventos por alguns milissegundos a cada tick: envia o que foi
//! enfileirado por `publish` e devolve as mensagens recebidas.

use crate::hal::{Broker, InboundMessage};
use monitor_core::config::BrokerConfig;
use rumqttc::{
    Client, ConnectReturnCode, Connection, ConnectionError, Event, MqttOptions, Packet, QoS,
    TlsConfiguration, Transport,
};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Códigos de erro no mesmo espaço do PubSubClient.
pub const CONNECTION_TIMEOUT: i32 = -4;
pub const CONNECTION_LOST: i32 = -3;
pub const CONNECT_FAILED: i32 = -2;
pub const DISCONNECTED: i32 = -1;
pub const CONNECTED: i32 = 0;

/// Capacidade da fila de requisições do cliente.
const REQUEST_CAPACITY: usize = 32;
/// Janela de espera por evento em cada iteração do `poll`.
const POLL_SLICE: Duration = Duration::from_millis(1);
/// Máximo de eventos processados por tick.
const MAX_EVENTS_PER_POLL: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("Falha ao ler certificados raiz {path}: {source}")]
    CaBundle {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

struct Session {
    client: Client,
    connection: Connection,
}

pub struct MqttBroker {
    host: String,
    port: u16,
    keep_alive: Duration,
    connect_timeout: Duration,
    ca_bundle: Option<Vec<u8>>,
    session: Option<Session>,
    connected: bool,
    last_error: i32,
}

impl MqttBroker {
    pub fn new(config: &BrokerConfig) -> Result<Self, BrokerError> {
        let ca_bundle = if config.tls {
            let path = PathBuf::from(&config.ca_cert_path);
            let pem = std::fs::read(&path).map_err(|source| BrokerError::CaBundle {
                path: path.clone(),
                source,
            })?;
            info!("TLS habilitado com certificados de {}", path.display());
            Some(pem)
        } else {
            warn!("TLS desabilitado – conexão em texto puro (somente dev/teste)");
            None
        };

        Ok(Self {
            host: config.host.clone(),
            port: config.port,
            keep_alive: Duration::from_secs(config.keep_alive_secs.max(5)),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            ca_bundle,
            session: None,
            connected: false,
            last_error: DISCONNECTED,
        })
    }

    fn options(&self, client_id: &str, user: &str, pass: &str) -> MqttOptions {
        let mut opts = MqttOptions::new(client_id, &self.host, self.port);
        opts.set_keep_alive(self.keep_alive);
        if !user.is_empty() {
            opts.set_credentials(user, pass);
        }
        if let Some(ca) = &self.ca_bundle {
            opts.set_transport(Transport::tls_with_config(TlsConfiguration::Simple {
                ca: ca.clone(),
                alpn: None,
                client_auth: None,
            }));
        }
        opts
    }

    fn fail(&mut self, code: i32) -> bool {
        self.connected = false;
        self.last_error = code;
        false
    }
}

fn refusal_code(code: ConnectReturnCode) -> i32 {
    match code {
        ConnectReturnCode::Success => CONNECTED,
        ConnectReturnCode::RefusedProtocolVersion => 1,
        ConnectReturnCode::BadClientId => 2,
        ConnectReturnCode::ServiceUnavailable => 3,
        ConnectReturnCode::BadUserNamePassword => 4,
        ConnectReturnCode::NotAuthorized => 5,
    }
}

impl Broker for MqttBroker {
    fn connect(&mut self, client_id: &str, user: &str, pass: &str) -> bool {
        self.disconnect();

        let (client, mut connection) =
            Client::new(self.options(client_id, user, pass), REQUEST_CAPACITY);
        let deadline = Instant::now() + self.connect_timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return self.fail(CONNECTION_TIMEOUT);
            }
            match connection.recv_timeout(remaining) {
                Ok(Ok(Event::Incoming(Packet::ConnAck(ack)))) => {
                    if ack.code != ConnectReturnCode::Success {
                        return self.fail(refusal_code(ack.code));
                    }
                    self.session = Some(Session { client, connection });
                    self.connected = true;
                    self.last_error = CONNECTED;
                    return true;
                }
                Ok(Ok(event)) => debug!("Evento antes do CONNACK: {event:?}"),
                Ok(Err(ConnectionError::ConnectionRefused(code))) => {
                    return self.fail(refusal_code(code));
                }
                Ok(Err(e)) => {
                    debug!("Handshake MQTT falhou: {e}");
                    return self.fail(CONNECT_FAILED);
                }
                Err(_) => return self.fail(CONNECTION_TIMEOUT),
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn subscribe(&mut self, topic: &str) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        match session.client.try_subscribe(topic, QoS::AtMostOnce) {
            Ok(()) => true,
            Err(e) => {
                warn!("Falha ao assinar {topic}: {e}");
                false
            }
        }
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> bool {
        if !self.connected {
            return false;
        }
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        match session
            .client
            .try_publish(topic, QoS::AtMostOnce, false, payload.to_vec())
        {
            Ok(()) => true,
            Err(e) => {
                debug!("Publish em {topic} recusado: {e}");
                false
            }
        }
    }

    fn poll(&mut self) -> Vec<InboundMessage> {
        let mut inbound = Vec::new();
        let Some(session) = self.session.as_mut() else {
            return inbound;
        };

        let mut lost = false;
        for _ in 0..MAX_EVENTS_PER_POLL {
            match session.connection.recv_timeout(POLL_SLICE) {
                Ok(Ok(Event::Incoming(Packet::Publish(p)))) => {
                    inbound.push(InboundMessage {
                        topic: p.topic.clone(),
                        payload: p.payload.to_vec(),
                    });
                }
                Ok(Ok(Event::Incoming(Packet::Disconnect))) => {
                    lost = true;
                    break;
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    warn!("Conexão MQTT perdida: {e}");
                    lost = true;
                    break;
                }
                // Nada pendente nesta janela
                Err(_) => break,
            }
        }

        if lost {
            self.session = None;
            self.fail(CONNECTION_LOST);
        }
        inbound
    }

    fn last_error_code(&self) -> i32 {
        self.last_error
    }

    fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            let _ = session.client.try_disconnect();
        }
        self.connected = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plaintext_broker_starts_disconnected() {
        let broker = MqttBroker::new(&BrokerConfig::default()).unwrap();
        assert!(!broker.is_connected());
        assert_eq!(broker.last_error_code(), DISCONNECTED);
    }

    #[test]
    fn missing_ca_bundle_is_an_error() {
        let config = BrokerConfig {
            tls: true,
            ca_cert_path: "/nonexistent/ca.pem".into(),
            ..Default::default()
        };
        assert!(matches!(
            MqttBroker::new(&config),
            Err(BrokerError::CaBundle { .. })
        ));
    }

    #[test]
    fn publish_without_session_fails() {
        let mut broker = MqttBroker::new(&BrokerConfig::default()).unwrap();
        assert!(!broker.publish("home/sensors/data", b"{}"));
        assert!(!broker.subscribe("home/sensors/control"));
        assert!(broker.poll().is_empty());
    }

    #[test]
    fn refusal_codes_follow_pubsubclient() {
        assert_eq!(refusal_code(ConnectReturnCode::BadUserNamePassword), 4);
        assert_eq!(refusal_code(ConnectReturnCode::NotAuthorized), 5);
    }
}
