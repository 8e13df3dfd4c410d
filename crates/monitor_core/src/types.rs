//! Definição de tipos/structs do monitor.
//!
//! Estado do loop de controle: snapshot de sensores, estado de conectividade,
//! timer de movimento, cadência de publicação e contadores do sistema.

// ──────────────────────────────────────────────
// Snapshot de sensores
// ──────────────────────────────────────────────

/// Uma leitura completa dos sensores, imutável depois de criada.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorSnapshot {
    /// Qualidade do ar escalada (proxy de PPM)
    pub air_quality: i32,
    /// Sensor de vazamento ativo
    pub is_leaking: bool,
    /// PIR detectou movimento nesta leitura
    pub motion_detected: bool,
    /// Luminosidade (LDR, escala ADC)
    pub light_level: i32,
    /// Temperatura (°C)
    pub temperature_c: f32,
    /// Umidade relativa (0–100%)
    pub humidity_pct: f32,
    /// Bateria (0–100%)
    pub battery_pct: f32,
    /// Instante da captura (ms monotônicos desde o boot)
    pub captured_at_ms: u64,
}

// ──────────────────────────────────────────────
// Conectividade
// ──────────────────────────────────────────────

/// Estado da máquina de conexão rede + broker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectivityState {
    #[default]
    Disconnected,
    LinkUpBrokerDown,
    Ready,
}

impl ConnectivityState {
    pub fn is_ready(self) -> bool {
        self == ConnectivityState::Ready
    }

    pub fn link_up(self) -> bool {
        self != ConnectivityState::Disconnected
    }
}

/// Situação do link reportada na seção `system` do documento de sensores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStatus {
    pub wifi_connected: bool,
    pub mqtt_connected: bool,
    /// Intensidade do sinal (dBm), 0 quando indisponível
    pub rssi: i32,
}

// ──────────────────────────────────────────────
// Movimento
// ──────────────────────────────────────────────

/// Latch do alerta de ausência de movimento.
///
/// `timeout_alert_sent` vale `true` para no máximo um alerta por período
/// ocioso e volta a `false` assim que há movimento.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotionTimer {
    /// Último movimento observado; `None` antes do primeiro.
    pub last_motion_ms: Option<u64>,
    pub timeout_alert_sent: bool,
}

impl MotionTimer {
    /// Registra movimento e rearma o alerta de timeout.
    pub fn observe_motion(&mut self, now_ms: u64) {
        self.last_motion_ms = Some(now_ms);
        self.timeout_alert_sent = false;
    }

    /// Tempo ocioso desde o último movimento.
    pub fn idle_ms(&self, now_ms: u64) -> Option<u64> {
        self.last_motion_ms.map(|t| now_ms.saturating_sub(t))
    }
}

// ──────────────────────────────────────────────
// Cadência
// ──────────────────────────────────────────────

/// Timers monotônicos do scheduler.
///
/// Cada `last_*` só avança quando a ação correspondente dispara.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishCadence {
    pub last_sample_ms: u64,
    pub last_publish_ms: u64,
    pub last_heartbeat_ms: u64,
    pub last_motion_check_ms: u64,
    pub sample_interval_ms: u64,
    /// Único intervalo alterável em runtime (`set_interval`)
    pub publish_interval_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub motion_check_interval_ms: u64,
}

impl PublishCadence {
    pub fn new(sample: u64, publish: u64, heartbeat: u64, motion_check: u64) -> Self {
        Self {
            last_sample_ms: 0,
            last_publish_ms: 0,
            last_heartbeat_ms: 0,
            last_motion_check_ms: 0,
            sample_interval_ms: sample,
            publish_interval_ms: publish,
            heartbeat_interval_ms: heartbeat,
            motion_check_interval_ms: motion_check,
        }
    }

    pub fn sample_due(&self, now_ms: u64) -> bool {
        elapsed(self.last_sample_ms, now_ms) >= self.sample_interval_ms
    }

    pub fn publish_due(&self, now_ms: u64) -> bool {
        elapsed(self.last_publish_ms, now_ms) >= self.publish_interval_ms
    }

    pub fn heartbeat_due(&self, now_ms: u64) -> bool {
        elapsed(self.last_heartbeat_ms, now_ms) >= self.heartbeat_interval_ms
    }

    pub fn motion_check_due(&self, now_ms: u64) -> bool {
        elapsed(self.last_motion_check_ms, now_ms) >= self.motion_check_interval_ms
    }

    pub fn mark_sampled(&mut self, now_ms: u64) {
        self.last_sample_ms = self.last_sample_ms.max(now_ms);
    }

    pub fn mark_published(&mut self, now_ms: u64) {
        self.last_publish_ms = self.last_publish_ms.max(now_ms);
    }

    pub fn mark_heartbeat(&mut self, now_ms: u64) {
        self.last_heartbeat_ms = self.last_heartbeat_ms.max(now_ms);
    }

    pub fn mark_motion_checked(&mut self, now_ms: u64) {
        self.last_motion_check_ms = self.last_motion_check_ms.max(now_ms);
    }
}

fn elapsed(since: u64, now: u64) -> u64 {
    now.saturating_sub(since)
}

// ──────────────────────────────────────────────
// Contadores
// ──────────────────────────────────────────────

/// Contadores do processo; só crescem, zerados apenas no restart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemCounters {
    pub publish_count: u32,
    pub error_count: u32,
    /// Mensagens de controle descartadas por erro de parse
    pub malformed_count: u32,
}

impl SystemCounters {
    pub fn record_publish(&mut self) {
        self.publish_count = self.publish_count.saturating_add(1);
    }

    pub fn record_error(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
    }

    pub fn record_malformed(&mut self) {
        self.malformed_count = self.malformed_count.saturating_add(1);
    }
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_snapshot_is_zeroed() {
        let s = SensorSnapshot::default();
        assert_eq!(s.air_quality, 0);
        assert!(!s.is_leaking);
        assert_eq!(s.captured_at_ms, 0);
    }

    #[test]
    fn motion_resets_latch() {
        let mut timer = MotionTimer {
            last_motion_ms: Some(1_000),
            timeout_alert_sent: true,
        };
        timer.observe_motion(5_000);
        assert_eq!(timer.last_motion_ms, Some(5_000));
        assert!(!timer.timeout_alert_sent);
        assert_eq!(timer.idle_ms(7_500), Some(2_500));
    }

    #[test]
    fn idle_is_none_before_first_motion() {
        assert_eq!(MotionTimer::default().idle_ms(10_000), None);
    }

    #[test]
    fn cadence_fires_on_interval_boundary() {
        let mut cadence = PublishCadence::new(2_000, 10_000, 60_000, 1_000);
        assert!(!cadence.sample_due(1_999));
        assert!(cadence.sample_due(2_000));
        cadence.mark_sampled(2_000);
        assert!(!cadence.sample_due(3_999));
        assert!(cadence.sample_due(4_000));
        assert!(!cadence.publish_due(9_999));
        assert!(cadence.publish_due(10_000));
    }

    #[test]
    fn cadence_never_moves_backwards() {
        let mut cadence = PublishCadence::new(2_000, 10_000, 60_000, 1_000);
        cadence.mark_published(20_000);
        cadence.mark_published(15_000);
        assert_eq!(cadence.last_publish_ms, 20_000);
    }

    #[test]
    fn counters_saturate() {
        let mut c = SystemCounters {
            error_count: u32::MAX,
            ..Default::default()
        };
        c.record_error();
        assert_eq!(c.error_count, u32::MAX);
        c.record_publish();
        assert_eq!(c.publish_count, 1);
    }

    #[test]
    fn state_helpers() {
        assert!(ConnectivityState::Ready.is_ready());
        assert!(ConnectivityState::LinkUpBrokerDown.link_up());
        assert!(!ConnectivityState::Disconnected.link_up());
    }
}
