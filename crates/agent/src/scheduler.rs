//! Loop de controle cooperativo.
//!
//! Um tick: conexão → fila de entrada → amostragem/alertas → publicação →
//! heartbeat → timeout de movimento → comandos. Todo o estado mutável vive em
//! [`Agent`] e é emprestado aos componentes em cada passo.

use crate::connectivity::ConnectivityManager;
use crate::dispatcher::{CommandDispatcher, Dispatch};
use crate::hal::{Clock, Indicator};
use crate::publisher::TelemetryPublisher;
use crate::sampler::SensorSampler;
use monitor_core::alerts::{AlertEngine, AlertEvent};
use monitor_core::types::{MotionTimer, PublishCadence, SensorSnapshot, SystemCounters};
use std::time::Duration;
use tracing::{debug, info};

/// Estado e componentes do agente.
pub struct Agent {
    pub clock: Box<dyn Clock>,
    pub sampler: SensorSampler,
    pub engine: AlertEngine,
    pub conn: ConnectivityManager,
    pub publisher: TelemetryPublisher,
    pub indicator: Box<dyn Indicator>,
    pub counters: SystemCounters,
    pub cadence: PublishCadence,
    pub motion: MotionTimer,
    /// Última leitura avaliada; é ela que vai para o tópico de dados.
    pub last_snapshot: Option<SensorSnapshot>,
}

/// Piscadas do LED de status na partida.
const STARTUP_BLINKS: u32 = 3;

impl Agent {
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Amostra, avalia os thresholds e dispara os alertas.
    pub fn sample_and_evaluate(&mut self, now_ms: u64) {
        let snapshot = self.sampler.read(now_ms, &mut self.motion);
        let alerts = self.engine.evaluate(&snapshot, &mut self.motion, now_ms);
        self.last_snapshot = Some(snapshot);
        self.raise(alerts);
    }

    /// Publica a última leitura avaliada. Antes da primeira amostra, amostra
    /// e avalia agora.
    pub fn publish_status(&mut self, now_ms: u64) -> bool {
        if self.last_snapshot.is_none() {
            self.sample_and_evaluate(now_ms);
        }
        let Some(snapshot) = self.last_snapshot.as_ref() else {
            return false;
        };
        self.publisher
            .publish_snapshot(&mut self.conn, snapshot, &mut self.counters, now_ms)
            .is_ok()
    }

    /// Alerta de sistema (INFO).
    pub fn announce(&mut self, message: &str) {
        let event = AlertEvent::system(message, self.now_ms());
        if let Err(e) = self.publisher.publish_alert(&mut self.conn, &event, &mut self.counters) {
            debug!("Alerta de sistema não enviado: {e}");
        }
    }

    fn raise(&mut self, alerts: Vec<AlertEvent>) {
        for alert in alerts {
            if let Err(e) = self.publisher.publish_alert(&mut self.conn, &alert, &mut self.counters) {
                debug!("Alerta {:?} não enviado: {e}", alert.kind);
            }
            if alert.wants_local_alert() {
                self.indicator.alert_pattern(true);
            }
        }
    }
}

pub struct Scheduler {
    agent: Agent,
    dispatcher: CommandDispatcher,
    tick: Duration,
}

impl Scheduler {
    pub fn new(agent: Agent, dispatcher: CommandDispatcher, tick_ms: u64) -> Self {
        Self {
            agent,
            dispatcher,
            tick: Duration::from_millis(tick_ms),
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Uma passada do loop.
    pub fn tick(&mut self) -> Dispatch {
        let agent = &mut self.agent;
        let now = agent.now_ms();

        let state = agent.conn.ensure_connected(agent.clock.as_ref(), &mut agent.counters);
        if agent.conn.take_announcement() {
            agent.announce("Device connected to MQTT broker");
        }
        let inbound = agent.conn.poll();

        if agent.cadence.sample_due(now) {
            agent.sample_and_evaluate(now);
            agent.cadence.mark_sampled(now);
        }

        if state.is_ready() && agent.cadence.publish_due(now) {
            if agent.publish_status(now) {
                agent.indicator.blink(1);
            }
            agent.cadence.mark_published(now);
        }

        if state.is_ready() && agent.cadence.heartbeat_due(now) {
            let _ = agent
                .publisher
                .publish_heartbeat(&mut agent.conn, &mut agent.counters, now);
            agent.cadence.mark_heartbeat(now);
        }

        if agent.cadence.motion_check_due(now) {
            if let Some(alert) = agent.engine.check_motion_timeout(&mut agent.motion, now) {
                agent.raise(vec![alert]);
            }
            agent.cadence.mark_motion_checked(now);
        }

        for msg in inbound {
            if self.dispatcher.on_message(&msg.topic, &msg.payload, &mut self.agent)
                == Dispatch::Restart
            {
                return Dispatch::Restart;
            }
        }

        Dispatch::Continue
    }

    /// Pisca o LED de partida e roda até um `reboot`.
    pub fn run(&mut self) {
        self.agent.indicator.blink(STARTUP_BLINKS);
        loop {
            let start = self.agent.now_ms();

            if self.tick() == Dispatch::Restart {
                info!(
                    "Loop encerrado para restart | publicados {} | erros {}",
                    self.agent.counters.publish_count, self.agent.counters.error_count
                );
                return;
            }

            let elapsed = Duration::from_millis(self.agent.now_ms().saturating_sub(start));
            if elapsed < self.tick {
                self.agent.clock.sleep(self.tick - elapsed);
            }
        }
    }
}
