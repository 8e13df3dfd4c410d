//! Configuração unificada via TOML.
//!
//! Identidade do dispositivo, rede, broker, tópicos, thresholds, intervalos e
//! calibração dos sensores num único `config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Limites aceitos pelo comando `set_interval` (ms).
pub const MIN_PUBLISH_INTERVAL_MS: u64 = 1_000;
pub const MAX_PUBLISH_INTERVAL_MS: u64 = 3_600_000;

/// Identidade do dispositivo.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub id: String,
    pub device_type: String,
    pub location: String,
    /// Prefixo do client id MQTT (sufixo aleatório a cada conexão)
    pub client_id_prefix: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            id: "esp32_monitor_01".into(),
            device_type: "wellness_monitor".into(),
            location: "living_room".into(),
            client_id_prefix: "esp32_monitor_01".into(),
        }
    }
}

/// Camada de rede e política de reconexão.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Tentativas de link por rodada de reconexão
    pub link_attempts: u32,
    /// Espera entre tentativas de link (ms)
    pub link_retry_delay_ms: u64,
    /// Intervalo mínimo entre rodadas de reconexão (ms)
    pub reconnect_cooldown_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            link_attempts: 20,
            link_retry_delay_ms: 500,
            reconnect_cooldown_ms: 10_000,
        }
    }
}

/// Broker MQTT.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// TLS com o bundle de certificados raiz abaixo
    pub tls: bool,
    /// Caminho do PEM com os certificados raiz (vazio = raízes do sistema não
    /// são carregadas; TLS exige o arquivo)
    pub ca_cert_path: String,
    pub keep_alive_secs: u64,
    /// Tempo máximo de espera pelo CONNACK (ms)
    pub connect_timeout_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 1883,
            username: String::new(),
            password: String::new(),
            tls: false,
            ca_cert_path: String::new(),
            keep_alive_secs: 30,
            connect_timeout_ms: 5_000,
        }
    }
}

/// Tópicos MQTT.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    pub sensor_data: String,
    pub alerts: String,
    pub heartbeat: String,
    pub control: String,
    pub status: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            sensor_data: "home/sensors/data".into(),
            alerts: "home/sensors/alerts".into(),
            heartbeat: "home/heartbeat".into(),
            control: "home/sensors/control".into(),
            status: "home/sensors/status".into(),
        }
    }
}

/// Thresholds do motor de alertas.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    pub air_quality_ppm: i32,
    pub temp_high_c: f32,
    pub temp_low_c: f32,
    pub humidity_high_pct: f32,
    pub humidity_low_pct: f32,
    pub light_dark: i32,
    pub motion_timeout_ms: u64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            air_quality_ppm: 400,
            temp_high_c: 30.0,
            temp_low_c: 15.0,
            humidity_high_pct: 70.0,
            humidity_low_pct: 30.0,
            light_dark: 300,
            motion_timeout_ms: 300_000,
        }
    }
}

/// Intervalos do loop (ms).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalConfig {
    pub tick_ms: u64,
    pub sample_ms: u64,
    pub publish_ms: u64,
    pub heartbeat_ms: u64,
    pub motion_check_ms: u64,
    /// Atraso entre o alerta de reboot e o restart do processo
    pub reboot_delay_ms: u64,
}

impl Default for IntervalConfig {
    fn default() -> Self {
        Self {
            tick_ms: 10,
            sample_ms: 2_000,
            publish_ms: 10_000,
            heartbeat_ms: 60_000,
            motion_check_ms: 1_000,
            reboot_delay_ms: 1_000,
        }
    }
}

/// Faixa linear raw → valor semântico de um canal analógico.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearRange {
    pub raw_min: i32,
    pub raw_max: i32,
    pub out_min: i32,
    pub out_max: i32,
}

impl LinearRange {
    /// Mapeia `raw` linearmente, saturando nos limites de saída.
    pub fn map(&self, raw: i32) -> i32 {
        let raw = raw.clamp(self.raw_min.min(self.raw_max), self.raw_min.max(self.raw_max));
        let span_in = i64::from(self.raw_max) - i64::from(self.raw_min);
        if span_in == 0 {
            return self.out_min;
        }
        let span_out = i64::from(self.out_max) - i64::from(self.out_min);
        let mapped = i64::from(self.out_min)
            + (i64::from(raw) - i64::from(self.raw_min)) * span_out / span_in;
        let (lo, hi) = (self.out_min.min(self.out_max), self.out_min.max(self.out_max));
        mapped.clamp(i64::from(lo), i64::from(hi)) as i32
    }
}

/// Calibração e polaridade dos sensores.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub temperature_min_c: f32,
    pub temperature_max_c: f32,
    /// Botão de vazamento com pull-up (pressionado = LOW)
    pub leak_active_low: bool,
    /// PIR ativo em HIGH
    pub motion_active_low: bool,
    /// MQ2: ADC 0–1000 → 50–500 PPM
    pub air_quality: LinearRange,
    /// LDR: ADC 12 bits
    pub light: LinearRange,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            air_quality: LinearRange {
                raw_min: 0,
                raw_max: 1000,
                out_min: 50,
                out_max: 500,
            },
            light: LinearRange {
                raw_min: 0,
                raw_max: 4095,
                out_min: 0,
                out_max: 4095,
            },
            temperature_min_c: -40.0,
            temperature_max_c: 85.0,
            leak_active_low: true,
            motion_active_low: false,
        }
    }
}

/// Configuração raiz do agente.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub device: DeviceConfig,
    pub network: NetworkConfig,
    pub broker: BrokerConfig,
    pub topics: TopicConfig,
    pub thresholds: AlertThresholds,
    pub intervals: IntervalConfig,
    pub calibration: CalibrationConfig,
}

impl AppConfig {
    /// Carrega configuração de um arquivo TOML.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str::<AppConfig>(&content) {
                    Ok(config) => {
                        info!("Configuração carregada de {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("Erro ao parsear {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Erro ao ler {}: {}", path.display(), e);
                }
            }
        }

        info!("Usando configuração padrão");
        AppConfig::default()
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        std::fs::write(path, content).map_err(|e| e.to_string())?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Retorna o caminho padrão do config.toml.
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.device.id.is_empty() {
            errors.push("device.id não pode ser vazio".into());
        }
        if self.broker.host.is_empty() {
            errors.push("broker.host não pode ser vazio".into());
        }
        if self.broker.port == 0 {
            errors.push("Porta do broker não pode ser 0".into());
        }
        if self.broker.tls && self.broker.ca_cert_path.is_empty() {
            errors.push("broker.tls exige broker.ca_cert_path".into());
        }
        if self.network.link_attempts == 0 {
            errors.push("network.link_attempts deve ser ≥ 1".into());
        }
        if self.intervals.tick_ms == 0 || self.intervals.tick_ms > 1_000 {
            errors.push(format!(
                "Tick inválido: {} ms (1–1000)",
                self.intervals.tick_ms
            ));
        }
        if !(MIN_PUBLISH_INTERVAL_MS..=MAX_PUBLISH_INTERVAL_MS).contains(&self.intervals.publish_ms) {
            errors.push(format!(
                "Intervalo de publicação inválido: {} ms ({MIN_PUBLISH_INTERVAL_MS}–{MAX_PUBLISH_INTERVAL_MS})",
                self.intervals.publish_ms
            ));
        }
        if self.intervals.sample_ms == 0 || self.intervals.heartbeat_ms == 0 {
            errors.push("Intervalos de amostragem e heartbeat devem ser > 0".into());
        }
        if self.thresholds.temp_low_c >= self.thresholds.temp_high_c {
            errors.push("thresholds.temp_low_c deve ser menor que temp_high_c".into());
        }
        if self.thresholds.humidity_low_pct >= self.thresholds.humidity_high_pct {
            errors.push("thresholds.humidity_low_pct deve ser menor que humidity_high_pct".into());
        }

        errors
    }
}
