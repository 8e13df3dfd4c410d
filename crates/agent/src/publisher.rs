//! Publicação de telemetria: dados de sensores, alertas e heartbeat.
//!
//! Entrega best-effort: uma única tentativa por mensagem, sem retry. Falhas
//! só aparecem no `error_count`, que vai junto no próximo documento de
//! sensores.

use crate::connectivity::ConnectivityManager;
use crate::hal::HostStats;
use monitor_core::alerts::AlertEvent;
use monitor_core::config::{DeviceConfig, TopicConfig};
use monitor_core::protocol::{
    AlertDocument, HeartbeatDocument, ProtocolError, SensorDataDocument, encode_alert,
    encode_heartbeat, encode_sensor_data,
};
use monitor_core::types::{ConnectivityState, SensorSnapshot, SystemCounters};
use tracing::{debug, error, info, warn};

/// Erros de publicação.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Conexão não está pronta ({0:?})")]
    NotReady(ConnectivityState),

    #[error("Broker recusou publish em {0}")]
    Rejected(String),

    #[error(transparent)]
    Encode(#[from] ProtocolError),
}

pub struct TelemetryPublisher {
    device: DeviceConfig,
    topics: TopicConfig,
    stats: Box<dyn HostStats>,
}

impl TelemetryPublisher {
    pub fn new(device: DeviceConfig, topics: TopicConfig, stats: Box<dyn HostStats>) -> Self {
        Self {
            device,
            topics,
            stats,
        }
    }

    /// Publica o documento de sensores; sucesso incrementa `publish_count`.
    pub fn publish_snapshot(
        &mut self,
        conn: &mut ConnectivityManager,
        snapshot: &SensorSnapshot,
        counters: &mut SystemCounters,
        now_ms: u64,
    ) -> Result<(), PublishError> {
        ready(conn)?;
        let doc = SensorDataDocument::new(&self.device, snapshot, conn.link_status(), counters, now_ms);
        let payload = encoded(encode_sensor_data(&doc), counters)?;

        match conn.publish(&self.topics.sensor_data, payload.as_bytes()) {
            Ok(()) => {
                counters.record_publish();
                debug!("📤 Dados publicados: {payload}");
                Ok(())
            }
            Err(e) => {
                counters.record_error();
                warn!("❌ Falha ao publicar dados de sensores: {e}");
                Err(e)
            }
        }
    }

    pub fn publish_alert(
        &mut self,
        conn: &mut ConnectivityManager,
        event: &AlertEvent,
        counters: &mut SystemCounters,
    ) -> Result<(), PublishError> {
        ready(conn)?;
        let doc = AlertDocument::new(&self.device, event);
        let payload = encoded(encode_alert(&doc), counters)?;

        match conn.publish(&self.topics.alerts, payload.as_bytes()) {
            Ok(()) => {
                info!("🚨 Alerta publicado: {:?} - {}", event.kind, event.message);
                Ok(())
            }
            Err(e) => {
                counters.record_error();
                warn!("Falha ao publicar alerta {:?}: {e}", event.kind);
                Err(e)
            }
        }
    }

    pub fn publish_heartbeat(
        &mut self,
        conn: &mut ConnectivityManager,
        counters: &mut SystemCounters,
        now_ms: u64,
    ) -> Result<(), PublishError> {
        ready(conn)?;
        let free_heap = self.stats.free_memory();
        let doc = HeartbeatDocument::new(&self.device, now_ms, free_heap, conn.signal_strength(), counters);
        let payload = encoded(encode_heartbeat(&doc), counters)?;

        match conn.publish(&self.topics.heartbeat, payload.as_bytes()) {
            Ok(()) => {
                debug!("❤️ Heartbeat publicado");
                Ok(())
            }
            Err(e) => {
                counters.record_error();
                warn!("Falha ao publicar heartbeat: {e}");
                Err(e)
            }
        }
    }
}

fn ready(conn: &ConnectivityManager) -> Result<(), PublishError> {
    match conn.state() {
        ConnectivityState::Ready => Ok(()),
        state => Err(PublishError::NotReady(state)),
    }
}

fn encoded(
    result: Result<String, ProtocolError>,
    counters: &mut SystemCounters,
) -> Result<String, PublishError> {
    result.map_err(|e| {
        counters.record_error();
        error!("Erro ao serializar documento: {e}");
        PublishError::Encode(e)
    })
}
