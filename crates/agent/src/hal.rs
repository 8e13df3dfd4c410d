//! Fronteira com os colaboradores externos: relógio, link de rede, broker
//! MQTT, sensores, saídas locais e estatísticas do host.
//!
//! O loop só enxerga estes traits; as implementações reais ficam em
//! `net_link`, `mqtt`, `simulated` e `monitor`, e os testes usam `fakes`.

use std::time::{Duration, Instant};

/// Relógio monotônico em ms desde o início do processo.
pub trait Clock {
    fn now_ms(&self) -> u64;
    fn sleep(&self, duration: Duration);
}

/// Relógio real baseado em [`Instant`].
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Camada de link (rede + TLS).
pub trait Transport {
    fn connect(&mut self, host: &str, port: u16) -> bool;
    fn is_connected(&mut self) -> bool;
    /// dBm; 0 quando não há rádio
    fn signal_strength(&self) -> i32;
    fn local_address(&self) -> String;
}

/// Mensagem recebida do broker, enfileirada até o próximo tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Cliente do broker de mensagens.
///
/// `poll` precisa ser chamado a cada tick: é ele que movimenta a conexão e
/// devolve a fila de mensagens recebidas.
pub trait Broker {
    fn connect(&mut self, client_id: &str, user: &str, pass: &str) -> bool;
    fn is_connected(&self) -> bool;
    fn subscribe(&mut self, topic: &str) -> bool;
    fn publish(&mut self, topic: &str, payload: &[u8]) -> bool;
    fn poll(&mut self) -> Vec<InboundMessage>;
    /// Código no estilo PubSubClient: 0 ok, <0 rede, >0 recusa do broker
    fn last_error_code(&self) -> i32;
    fn disconnect(&mut self);
}

/// Canais analógicos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalogChannel {
    /// MQ2 (gás/fumaça)
    AirQuality,
    /// LDR
    Light,
}

/// Canais digitais.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigitalChannel {
    Leak,
    Motion,
}

/// Leituras ambientais já em unidades físicas.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnvironmentReading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub battery_pct: f32,
}

/// Aquisição bruta dos sensores. Síncrona e sem falha.
pub trait SensorSource {
    fn read_analog(&mut self, channel: AnalogChannel) -> i32;
    /// `true` = nível HIGH no pino
    fn read_digital(&mut self, channel: DigitalChannel) -> bool;
    fn read_environment(&mut self, now_ms: u64) -> EnvironmentReading;
}

/// LED de status e buzzer.
pub trait Indicator {
    fn set_status_led(&mut self, on: bool);
    /// Três piscadas; buzzer junto quando `buzzer` é verdadeiro.
    fn alert_pattern(&mut self, buzzer: bool);
    /// Pisca o LED `times` vezes e o deixa apagado.
    fn blink(&mut self, times: u32);
}

/// Métricas do host para o heartbeat.
pub trait HostStats {
    /// Memória livre em bytes.
    fn free_memory(&mut self) -> u64;
}
