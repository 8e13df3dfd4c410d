//! Máquina de estados de conectividade (link de rede + broker MQTT).
//!
//! ```text
//!               link ok                 CONNACK
//! Disconnected ────────▶ LinkUpBrokerDown ───────▶ Ready
//!      ▲                        ▲                    │
//!      └──── link caiu ─────────┴── broker caiu ─────┘
//! ```
//!
//! Tentativas de reconexão respeitam um cooldown; fora dele
//! `ensure_connected` só consulta o estado e pode ser chamado a cada tick.
//! Transporte e broker são privados: conexão e assinaturas só acontecem aqui.

use crate::hal::{Broker, Clock, InboundMessage, Transport};
use crate::publisher::PublishError;
use monitor_core::config::AppConfig;
use monitor_core::types::{ConnectivityState, LinkStatus, SystemCounters};
use rand::Rng;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct ConnectivityManager {
    transport: Box<dyn Transport>,
    broker: Box<dyn Broker>,
    host: String,
    port: u16,
    username: String,
    password: String,
    client_id_prefix: String,
    subscriptions: [String; 2],
    link_attempts: u32,
    link_retry_delay: Duration,
    cooldown_ms: u64,
    state: ConnectivityState,
    last_attempt_ms: Option<u64>,
    announce_pending: bool,
}

impl ConnectivityManager {
    pub fn new(transport: Box<dyn Transport>, broker: Box<dyn Broker>, config: &AppConfig) -> Self {
        Self {
            transport,
            broker,
            host: config.broker.host.clone(),
            port: config.broker.port,
            username: config.broker.username.clone(),
            password: config.broker.password.clone(),
            client_id_prefix: config.device.client_id_prefix.clone(),
            subscriptions: [config.topics.control.clone(), config.topics.status.clone()],
            link_attempts: config.network.link_attempts.max(1),
            link_retry_delay: Duration::from_millis(config.network.link_retry_delay_ms),
            cooldown_ms: config.network.reconnect_cooldown_ms,
            state: ConnectivityState::Disconnected,
            last_attempt_ms: None,
            announce_pending: false,
        }
    }

    pub fn state(&self) -> ConnectivityState {
        self.state
    }

    /// Garante a conexão, tentando reconectar no máximo uma vez por cooldown.
    pub fn ensure_connected(
        &mut self,
        clock: &dyn Clock,
        counters: &mut SystemCounters,
    ) -> ConnectivityState {
        self.refresh();
        if self.state.is_ready() {
            return self.state;
        }

        let now = clock.now_ms();
        if let Some(last) = self.last_attempt_ms {
            if now.saturating_sub(last) < self.cooldown_ms {
                return self.state;
            }
        }

        let state = self.attempt(clock, counters);
        // Cooldown conta a partir do fim da rodada
        self.last_attempt_ms = Some(clock.now_ms());
        state
    }

    /// Consome o aviso de "conectado" gerado pelo último handshake.
    pub fn take_announcement(&mut self) -> bool {
        std::mem::take(&mut self.announce_pending)
    }

    pub fn link_status(&self) -> LinkStatus {
        LinkStatus {
            wifi_connected: self.state.link_up(),
            mqtt_connected: self.state.is_ready(),
            rssi: self.signal_strength(),
        }
    }

    pub fn signal_strength(&self) -> i32 {
        if self.state.link_up() {
            self.transport.signal_strength()
        } else {
            0
        }
    }

    /// Publica no broker; recusado fora do estado `Ready`.
    pub fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        if !self.state.is_ready() {
            return Err(PublishError::NotReady(self.state));
        }
        if self.broker.publish(topic, payload) {
            Ok(())
        } else {
            Err(PublishError::Rejected(topic.to_string()))
        }
    }

    /// Movimenta o broker e drena a fila de entrada.
    pub fn poll(&mut self) -> Vec<InboundMessage> {
        if !self.state.link_up() {
            return Vec::new();
        }
        self.broker.poll()
    }

    /// Última chance de enviar o que está na fila antes do restart.
    pub fn flush(&mut self) {
        if self.state.is_ready() {
            let dropped = self.broker.poll().len();
            if dropped > 0 {
                debug!("{dropped} mensagens de entrada descartadas no flush");
            }
        }
        self.broker.disconnect();
    }

    fn refresh(&mut self) {
        let next = if !self.transport.is_connected() {
            ConnectivityState::Disconnected
        } else if self.state == ConnectivityState::Disconnected {
            ConnectivityState::LinkUpBrokerDown
        } else if self.state.is_ready() && !self.broker.is_connected() {
            ConnectivityState::LinkUpBrokerDown
        } else {
            self.state
        };

        if next != self.state {
            match next {
                ConnectivityState::Disconnected => warn!("Link de rede perdido"),
                ConnectivityState::LinkUpBrokerDown if self.state.is_ready() => {
                    warn!("Conexão com o broker perdida")
                }
                _ => info!("Link de rede ativo"),
            }
            if !next.is_ready() && self.broker.is_connected() {
                self.broker.disconnect();
            }
            self.state = next;
        }
    }

    fn attempt(&mut self, clock: &dyn Clock, counters: &mut SystemCounters) -> ConnectivityState {
        if self.state == ConnectivityState::Disconnected && !self.establish_link(clock) {
            counters.record_error();
            warn!(
                "Link de rede indisponível após {} tentativas",
                self.link_attempts
            );
            return self.state;
        }
        self.handshake(counters)
    }

    fn establish_link(&mut self, clock: &dyn Clock) -> bool {
        info!("📶 Conectando link de rede → {}:{}", self.host, self.port);

        for attempt in 1..=self.link_attempts {
            if self.transport.connect(&self.host, self.port) {
                self.state = ConnectivityState::LinkUpBrokerDown;
                info!(
                    "✅ Link ativo | IP {} | sinal {} dBm",
                    self.transport.local_address(),
                    self.transport.signal_strength()
                );
                return true;
            }
            debug!("Tentativa de link {attempt}/{} falhou", self.link_attempts);
            if attempt < self.link_attempts {
                clock.sleep(self.link_retry_delay);
            }
        }
        false
    }

    fn handshake(&mut self, counters: &mut SystemCounters) -> ConnectivityState {
        let client_id = format!(
            "{}_{}",
            self.client_id_prefix,
            rand::thread_rng().gen_range(10_000..100_000)
        );
        info!("🔗 Conectando ao broker {}:{} como {client_id}", self.host, self.port);

        if !self.broker.connect(&client_id, &self.username, &self.password) {
            counters.record_error();
            warn!(
                "❌ Falha na conexão MQTT, rc={}",
                self.broker.last_error_code()
            );
            return self.state;
        }

        for topic in &self.subscriptions {
            if self.broker.subscribe(topic) {
                info!("   Assinado: {topic}");
            } else {
                warn!("   Falha ao assinar {topic}");
            }
        }

        self.state = ConnectivityState::Ready;
        self.announce_pending = true;
        info!("✅ MQTT conectado");
        self.state
    }
}
