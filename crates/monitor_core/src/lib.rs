//! # Monitor Core
//!
//! Crate compartilhada do monitor ambiental: modelo de dados, motor de
//! alertas, documentos JSON do protocolo MQTT e configuração TOML.
//!
//! ## Módulos
//! - [`types`] – Snapshot de sensores, estado de conexão, timers e contadores
//! - [`alerts`] – Tipos, severidades e avaliação de thresholds
//! - [`protocol`] – Documentos de saída com limite de tamanho e comandos de entrada
//! - [`config`] – Configuração unificada via TOML

pub mod types;
pub mod alerts;
pub mod protocol;
pub mod config;

// Re-exports convenientes
pub use types::{ConnectivityState, LinkStatus, MotionTimer, PublishCadence, SensorSnapshot, SystemCounters};
pub use alerts::{AlertEngine, AlertEvent, AlertKind, Severity};
pub use protocol::{Command, Inbound, ProtocolError};
pub use config::AppConfig;
