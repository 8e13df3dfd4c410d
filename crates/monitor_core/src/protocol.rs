//! Protocolo de comunicação MQTT (JSON).
//!
//! Três documentos de saída e um de entrada:
//!
//! ```text
//! home/sensors/data    → SensorDataDocument   (≤ 768 bytes)
//! home/sensors/alerts  → AlertDocument        (≤ 384 bytes)
//! home/heartbeat       → HeartbeatDocument    (≤ 256 bytes)
//! home/sensors/control ← {"command": "...", "interval_ms": N}
//! ```
//!
//! O encoder falha fechado: um documento acima do limite vira
//! [`ProtocolError::TooLarge`], nunca é truncado.

use crate::alerts::{AlertContext, AlertEvent, AlertKind, Severity};
use crate::config::DeviceConfig;
use crate::types::{LinkStatus, SensorSnapshot, SystemCounters};
use serde::Serialize;
use serde_json::Value;

/// Limites de tamanho no fio, por documento.
pub const MAX_SENSOR_DATA_BYTES: usize = 768;
pub const MAX_ALERT_BYTES: usize = 384;
pub const MAX_HEARTBEAT_BYTES: usize = 256;
/// Comandos maiores que isso nem são parseados.
pub const MAX_COMMAND_BYTES: usize = 256;

/// Erros do protocolo.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Documento com {size} bytes excede o limite de {max}")]
    TooLarge { size: usize, max: usize },

    #[error("Erro de serialização: {0}")]
    Serialize(String),

    #[error("JSON inválido: {0}")]
    Parse(String),
}

// ──────────────────────────────────────────────
// Documentos de saída
// ──────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SensorsSection {
    pub air_quality_ppm: i32,
    pub water_leak: bool,
    pub motion: bool,
    pub light_level: i32,
    pub temperature_c: f32,
    pub humidity_percent: f32,
    pub battery_percent: f32,
}

#[derive(Debug, Serialize)]
pub struct SystemSection {
    pub wifi_connected: bool,
    pub mqtt_connected: bool,
    pub rssi: i32,
    pub publish_count: u32,
    pub error_count: u32,
}

/// Documento periódico com leituras e estado do sistema.
#[derive(Debug, Serialize)]
pub struct SensorDataDocument<'a> {
    pub device_id: &'a str,
    pub device_type: &'a str,
    pub location: &'a str,
    pub timestamp: u64,
    pub uptime_seconds: u64,
    pub sensors: SensorsSection,
    pub system: SystemSection,
}

impl<'a> SensorDataDocument<'a> {
    pub fn new(
        device: &'a DeviceConfig,
        snapshot: &SensorSnapshot,
        link: LinkStatus,
        counters: &SystemCounters,
        now_ms: u64,
    ) -> Self {
        Self {
            device_id: &device.id,
            device_type: &device.device_type,
            location: &device.location,
            timestamp: now_ms,
            uptime_seconds: now_ms / 1_000,
            sensors: SensorsSection {
                air_quality_ppm: snapshot.air_quality,
                water_leak: snapshot.is_leaking,
                motion: snapshot.motion_detected,
                light_level: snapshot.light_level,
                temperature_c: snapshot.temperature_c,
                humidity_percent: snapshot.humidity_pct,
                battery_percent: snapshot.battery_pct,
            },
            system: SystemSection {
                wifi_connected: link.wifi_connected,
                mqtt_connected: link.mqtt_connected,
                rssi: link.rssi,
                publish_count: counters.publish_count,
                error_count: counters.error_count,
            },
        }
    }
}

/// Valor extra do alerta, com o tipo JSON que cada regra usa.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AlertValue {
    Int(i32),
    Bool(bool),
    Float(f32),
}

#[derive(Debug, Serialize)]
pub struct AlertDocument<'a> {
    pub device_id: &'a str,
    pub timestamp: u64,
    pub alert_type: AlertKind,
    pub severity: Severity,
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<AlertValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<i32>,
}

impl<'a> AlertDocument<'a> {
    pub fn new(device: &'a DeviceConfig, event: &'a AlertEvent) -> Self {
        let (value, threshold) = match event.context {
            AlertContext::None => (None, None),
            AlertContext::Threshold { value, threshold } => {
                (Some(AlertValue::Int(value)), Some(threshold))
            }
            AlertContext::Flag(flag) => (Some(AlertValue::Bool(flag)), None),
            AlertContext::Reading(reading) => (Some(AlertValue::Float(reading)), None),
        };
        Self {
            device_id: &device.id,
            timestamp: event.raised_at_ms,
            alert_type: event.kind,
            severity: event.severity,
            message: &event.message,
            value,
            threshold,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HeartbeatDocument<'a> {
    pub device_id: &'a str,
    pub timestamp: u64,
    pub uptime_minutes: u64,
    pub free_heap: u64,
    pub wifi_rssi: i32,
    pub publish_count: u32,
}

impl<'a> HeartbeatDocument<'a> {
    pub fn new(
        device: &'a DeviceConfig,
        now_ms: u64,
        free_heap: u64,
        wifi_rssi: i32,
        counters: &SystemCounters,
    ) -> Self {
        Self {
            device_id: &device.id,
            timestamp: now_ms,
            uptime_minutes: now_ms / 60_000,
            free_heap,
            wifi_rssi,
            publish_count: counters.publish_count,
        }
    }
}

/// Serializa um documento verificando o limite de tamanho.
pub fn encode_document<T: Serialize>(doc: &T, max: usize) -> Result<String, ProtocolError> {
    let json = serde_json::to_string(doc).map_err(|e| ProtocolError::Serialize(e.to_string()))?;
    if json.len() > max {
        return Err(ProtocolError::TooLarge {
            size: json.len(),
            max,
        });
    }
    Ok(json)
}

pub fn encode_sensor_data(doc: &SensorDataDocument<'_>) -> Result<String, ProtocolError> {
    encode_document(doc, MAX_SENSOR_DATA_BYTES)
}

pub fn encode_alert(doc: &AlertDocument<'_>) -> Result<String, ProtocolError> {
    encode_document(doc, MAX_ALERT_BYTES)
}

pub fn encode_heartbeat(doc: &HeartbeatDocument<'_>) -> Result<String, ProtocolError> {
    encode_document(doc, MAX_HEARTBEAT_BYTES)
}

// ──────────────────────────────────────────────
// Comandos de entrada
// ──────────────────────────────────────────────

/// Comandos reconhecidos no tópico de controle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    BuzzerTest,
    GetStatus,
    Reboot,
    LedOn,
    LedOff,
    /// `interval_ms` ausente ou não inteiro vira `None`
    SetInterval { interval_ms: Option<u64> },
}

impl Command {
    /// Nome no fio.
    pub fn name(&self) -> &'static str {
        match self {
            Command::BuzzerTest => "buzzer_test",
            Command::GetStatus => "get_status",
            Command::Reboot => "reboot",
            Command::LedOn => "led_on",
            Command::LedOff => "led_off",
            Command::SetInterval { .. } => "set_interval",
        }
    }
}

/// Resultado do parse de uma mensagem de controle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Command(Command),
    /// Chave `command` presente mas desconhecida
    Unknown(String),
    /// JSON válido sem `command` textual
    NoCommand,
}

/// Parseia o payload de uma mensagem de controle.
pub fn parse_command(payload: &[u8]) -> Result<Inbound, ProtocolError> {
    if payload.len() > MAX_COMMAND_BYTES {
        return Err(ProtocolError::TooLarge {
            size: payload.len(),
            max: MAX_COMMAND_BYTES,
        });
    }

    let doc: Value =
        serde_json::from_slice(payload).map_err(|e| ProtocolError::Parse(e.to_string()))?;

    let Some(name) = doc.get("command").and_then(Value::as_str) else {
        return Ok(Inbound::NoCommand);
    };

    let command = match name {
        "buzzer_test" => Command::BuzzerTest,
        "get_status" => Command::GetStatus,
        "reboot" => Command::Reboot,
        "led_on" => Command::LedOn,
        "led_off" => Command::LedOff,
        "set_interval" => Command::SetInterval {
            interval_ms: doc.get("interval_ms").and_then(Value::as_u64),
        },
        other => return Ok(Inbound::Unknown(other.to_string())),
    };

    Ok(Inbound::Command(command))
}

// ──────────────────────────────────────────────
// Testes
// ──────────────────────────────────────────────
