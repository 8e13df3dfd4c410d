//! Despacho dos comandos recebidos no tópico de controle.

use crate::scheduler::Agent;
use monitor_core::config::{MAX_PUBLISH_INTERVAL_MS, MIN_PUBLISH_INTERVAL_MS};
use monitor_core::protocol::{Command, Inbound, parse_command};
use tracing::{debug, info, warn};

/// O que o loop deve fazer depois de uma mensagem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Continue,
    /// `reboot` recebido: alerta enviado, processo deve reiniciar
    Restart,
}

pub struct CommandDispatcher {
    control_topic: String,
}

impl CommandDispatcher {
    pub fn new(control_topic: impl Into<String>) -> Self {
        Self {
            control_topic: control_topic.into(),
        }
    }

    /// Trata uma mensagem drenada da fila do broker.
    pub fn on_message(&self, topic: &str, payload: &[u8], agent: &mut Agent) -> Dispatch {
        info!("📨 Mensagem MQTT [{topic}]: {}", String::from_utf8_lossy(payload));

        if topic != self.control_topic {
            debug!("Tópico {topic} sem tratamento");
            return Dispatch::Continue;
        }

        let command = match parse_command(payload) {
            Ok(Inbound::Command(command)) => command,
            Ok(Inbound::Unknown(name)) => {
                debug!("Comando desconhecido ignorado: {name}");
                return Dispatch::Continue;
            }
            Ok(Inbound::NoCommand) => {
                debug!("Mensagem de controle sem 'command'");
                return Dispatch::Continue;
            }
            Err(e) => {
                agent.counters.record_malformed();
                warn!("Mensagem de controle descartada: {e}");
                return Dispatch::Continue;
            }
        };

        info!("Comando recebido: {}", command.name());
        self.execute(command, agent)
    }

    fn execute(&self, command: Command, agent: &mut Agent) -> Dispatch {
        match command {
            Command::BuzzerTest => {
                // Buzzer só toca para ar e vazamento; o teste pisca o LED
                agent.indicator.alert_pattern(false);
                agent.announce("Buzzer test completed");
            }
            Command::GetStatus => {
                let now = agent.now_ms();
                agent.publish_status(now);
            }
            Command::Reboot => {
                info!("Reiniciando dispositivo...");
                agent.announce("Device rebooting");
                agent.conn.flush();
                return Dispatch::Restart;
            }
            Command::LedOn => {
                agent.indicator.set_status_led(true);
                agent.announce("LED turned ON");
            }
            Command::LedOff => {
                agent.indicator.set_status_led(false);
                agent.announce("LED turned OFF");
            }
            Command::SetInterval {
                interval_ms: Some(ms),
            } if (MIN_PUBLISH_INTERVAL_MS..=MAX_PUBLISH_INTERVAL_MS).contains(&ms) => {
                agent.cadence.publish_interval_ms = ms;
                info!("Intervalo de publicação atualizado: {ms} ms");
            }
            Command::SetInterval {
                interval_ms: Some(ms),
            } => {
                warn!(
                    "set_interval fora da faixa: {ms} ms ({MIN_PUBLISH_INTERVAL_MS}–{MAX_PUBLISH_INTERVAL_MS})"
                );
            }
            Command::SetInterval { interval_ms: None } => {
                warn!("set_interval sem 'interval_ms' inteiro");
            }
        }
        Dispatch::Continue
    }
}
