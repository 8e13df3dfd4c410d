//! Sistema de alertas – tipos, severidades e avaliação de thresholds.
//!
//! Regras avaliadas de forma independente a cada passada; várias podem
//! disparar juntas. Vazamento e escuridão são level-triggered (repetem a cada
//! avaliação enquanto a condição persistir). Ausência de movimento usa o latch
//! de [`MotionTimer`].

use crate::config::AlertThresholds;
use crate::types::{MotionTimer, SensorSnapshot};
use serde::{Deserialize, Serialize};

/// Tipo de alerta (campo `alert_type` no fio).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    AirQuality,
    WaterLeak,
    Temperature,
    Humidity,
    #[serde(rename = "LIGHT")]
    Darkness,
    MotionTimeout,
    System,
}

/// Severidade do alerta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
}

/// Contexto numérico anexado ao documento de alerta.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlertContext {
    None,
    /// Valor medido e threshold (qualidade do ar)
    Threshold { value: i32, threshold: i32 },
    /// Leitura digital bruta (vazamento)
    Flag(bool),
    /// Leitura analógica (temperatura)
    Reading(f32),
}

/// Um alerta disparado. Transitório: construído, publicado e descartado.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
    pub context: AlertContext,
    pub raised_at_ms: u64,
}

impl AlertEvent {
    /// Alerta de sistema (conexão, reboot, LED, teste de buzzer).
    pub fn system(message: impl Into<String>, now_ms: u64) -> Self {
        Self {
            kind: AlertKind::System,
            severity: Severity::Info,
            message: message.into(),
            context: AlertContext::None,
            raised_at_ms: now_ms,
        }
    }

    /// LED + buzzer local só para qualidade do ar e vazamento em HIGH.
    pub fn wants_local_alert(&self) -> bool {
        self.severity == Severity::High
            && matches!(self.kind, AlertKind::AirQuality | AlertKind::WaterLeak)
    }
}

/// Motor de alertas configurado com os thresholds do dispositivo.
#[derive(Debug, Clone)]
pub struct AlertEngine {
    thresholds: AlertThresholds,
}

impl AlertEngine {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    /// Avalia um snapshot e retorna os alertas disparados.
    ///
    /// `motion` só é alterado pelo latch do timeout de movimento.
    pub fn evaluate(
        &self,
        snapshot: &SensorSnapshot,
        motion: &mut MotionTimer,
        now_ms: u64,
    ) -> Vec<AlertEvent> {
        let t = &self.thresholds;
        let mut alerts = Vec::new();
        let mut raise = |kind, severity, message: String, context| {
            alerts.push(AlertEvent {
                kind,
                severity,
                message,
                context,
                raised_at_ms: now_ms,
            });
        };

        // Qualidade do ar
        if snapshot.air_quality > t.air_quality_ppm {
            raise(
                AlertKind::AirQuality,
                Severity::High,
                format!("Air quality critical: {} PPM", snapshot.air_quality),
                AlertContext::Threshold {
                    value: snapshot.air_quality,
                    threshold: t.air_quality_ppm,
                },
            );
        }

        // Vazamento
        if snapshot.is_leaking {
            raise(
                AlertKind::WaterLeak,
                Severity::High,
                "Water leak detected!".into(),
                AlertContext::Flag(true),
            );
        }

        // Temperatura
        if snapshot.temperature_c > t.temp_high_c {
            raise(
                AlertKind::Temperature,
                Severity::Medium,
                format!("High temperature: {:.2}°C", snapshot.temperature_c),
                AlertContext::Reading(snapshot.temperature_c),
            );
        } else if snapshot.temperature_c < t.temp_low_c {
            raise(
                AlertKind::Temperature,
                Severity::Medium,
                format!("Low temperature: {:.2}°C", snapshot.temperature_c),
                AlertContext::Reading(snapshot.temperature_c),
            );
        }

        // Umidade
        if snapshot.humidity_pct > t.humidity_high_pct {
            raise(
                AlertKind::Humidity,
                Severity::Low,
                format!("High humidity: {:.2}%", snapshot.humidity_pct),
                AlertContext::None,
            );
        } else if snapshot.humidity_pct < t.humidity_low_pct {
            raise(
                AlertKind::Humidity,
                Severity::Low,
                format!("Low humidity: {:.2}%", snapshot.humidity_pct),
                AlertContext::None,
            );
        }

        // Escuridão
        if snapshot.light_level < t.light_dark {
            raise(
                AlertKind::Darkness,
                Severity::Info,
                "Room is dark".into(),
                AlertContext::None,
            );
        }

        if let Some(alert) = self.check_motion_timeout(motion, now_ms) {
            alerts.push(alert);
        }

        alerts
    }

    /// Dispara uma única vez por período ocioso e arma o latch.
    pub fn check_motion_timeout(&self, motion: &mut MotionTimer, now_ms: u64) -> Option<AlertEvent> {
        if motion.timeout_alert_sent {
            return None;
        }
        let idle = motion.idle_ms(now_ms)?;
        if idle <= self.thresholds.motion_timeout_ms {
            return None;
        }

        motion.timeout_alert_sent = true;
        Some(AlertEvent {
            kind: AlertKind::MotionTimeout,
            severity: Severity::Medium,
            message: format!(
                "No motion detected for {} minutes",
                self.thresholds.motion_timeout_ms / 60_000
            ),
            context: AlertContext::None,
            raised_at_ms: now_ms,
        })
    }
}
