//! Colaboradores falsos para os testes do agente.
//!
//! Cada fake expõe um handle (`Rc<RefCell<_>>`) para o teste inspecionar o
//! que o componente fez depois de receber o fake como `Box<dyn Trait>`.

use crate::hal::{
    AnalogChannel, Broker, Clock, DigitalChannel, EnvironmentReading, HostStats, InboundMessage,
    Indicator, SensorSource, Transport,
};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

// ──────────────────────────────────────────────
// Relógio
// ──────────────────────────────────────────────

/// Relógio manual; `sleep` apenas avança o tempo.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn at(ms: u64) -> Self {
        let clock = Self::default();
        clock.set(ms);
        clock
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration.as_millis() as u64);
    }
}

// ──────────────────────────────────────────────
// Transporte
// ──────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct TransportLog {
    pub up: bool,
    /// Quantas chamadas a `connect` falham antes de subir
    pub fail_connects: u32,
    /// Nunca sobe
    pub unreachable: bool,
    pub connect_calls: u32,
    pub rssi: i32,
}

#[derive(Clone, Default)]
pub struct FakeTransport {
    pub log: Rc<RefCell<TransportLog>>,
    /// Tempo gasto por chamada a `connect`, no relógio dado
    cost: Option<(ManualClock, u64)>,
}

impl FakeTransport {
    pub fn up() -> Self {
        let t = Self::default();
        t.log.borrow_mut().up = true;
        t.log.borrow_mut().rssi = -55;
        t
    }

    pub fn costing(mut self, clock: &ManualClock, ms: u64) -> Self {
        self.cost = Some((clock.clone(), ms));
        self
    }
}

impl Transport for FakeTransport {
    fn connect(&mut self, _host: &str, _port: u16) -> bool {
        if let Some((clock, ms)) = &self.cost {
            clock.advance(*ms);
        }
        let mut log = self.log.borrow_mut();
        log.connect_calls += 1;
        if log.unreachable {
            return false;
        }
        if log.fail_connects > 0 {
            log.fail_connects -= 1;
            return false;
        }
        log.up = true;
        true
    }

    fn is_connected(&mut self) -> bool {
        self.log.borrow().up
    }

    fn signal_strength(&self) -> i32 {
        self.log.borrow().rssi
    }

    fn local_address(&self) -> String {
        "192.168.1.50".into()
    }
}

// ──────────────────────────────────────────────
// Broker
// ──────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct BrokerLog {
    pub connected: bool,
    pub accept_connect: bool,
    pub accept_publish: bool,
    pub connect_attempts: u32,
    pub client_ids: Vec<String>,
    pub subscriptions: Vec<String>,
    pub published: Vec<(String, String)>,
    pub inbound: VecDeque<InboundMessage>,
    pub polls: u32,
    pub error_code: i32,
}

impl BrokerLog {
    /// Payloads publicados num tópico.
    pub fn on_topic(&self, topic: &str) -> Vec<String> {
        self.published
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[derive(Clone, Default)]
pub struct FakeBroker {
    pub log: Rc<RefCell<BrokerLog>>,
}

impl FakeBroker {
    pub fn accepting() -> Self {
        let b = Self::default();
        {
            let mut log = b.log.borrow_mut();
            log.accept_connect = true;
            log.accept_publish = true;
        }
        b
    }

    pub fn refusing(code: i32) -> Self {
        let b = Self::default();
        b.log.borrow_mut().error_code = code;
        b
    }

    pub fn push_inbound(&self, topic: &str, payload: &str) {
        self.log.borrow_mut().inbound.push_back(InboundMessage {
            topic: topic.into(),
            payload: payload.as_bytes().to_vec(),
        });
    }

    pub fn drop_connection(&self) {
        self.log.borrow_mut().connected = false;
    }
}

impl Broker for FakeBroker {
    fn connect(&mut self, client_id: &str, _user: &str, _pass: &str) -> bool {
        let mut log = self.log.borrow_mut();
        log.connect_attempts += 1;
        log.client_ids.push(client_id.into());
        log.connected = log.accept_connect;
        if log.connected {
            log.error_code = 0;
        }
        log.connected
    }

    fn is_connected(&self) -> bool {
        self.log.borrow().connected
    }

    fn subscribe(&mut self, topic: &str) -> bool {
        self.log.borrow_mut().subscriptions.push(topic.into());
        true
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> bool {
        let mut log = self.log.borrow_mut();
        if !log.connected || !log.accept_publish {
            return false;
        }
        log.published
            .push((topic.into(), String::from_utf8_lossy(payload).into_owned()));
        true
    }

    fn poll(&mut self) -> Vec<InboundMessage> {
        let mut log = self.log.borrow_mut();
        log.polls += 1;
        log.inbound.drain(..).collect()
    }

    fn last_error_code(&self) -> i32 {
        self.log.borrow().error_code
    }

    fn disconnect(&mut self) {
        self.log.borrow_mut().connected = false;
    }
}

// ──────────────────────────────────────────────
// Sensores
// ──────────────────────────────────────────────

/// Fonte com leituras fixas, alteráveis durante o teste pelo handle.
#[derive(Clone)]
pub struct ScriptedSource {
    pub state: Rc<RefCell<ScriptedState>>,
}

#[derive(Debug, Clone)]
pub struct ScriptedState {
    pub analog: HashMap<AnalogChannel, i32>,
    pub digital: HashMap<DigitalChannel, bool>,
    pub environment: EnvironmentReading,
    pub reads: u32,
}

impl Default for ScriptedSource {
    /// Ambiente calmo: ar limpo, sem vazamento (pull-up em HIGH), sem
    /// movimento, sala iluminada.
    fn default() -> Self {
        let state = ScriptedState {
            analog: HashMap::from([(AnalogChannel::AirQuality, 200), (AnalogChannel::Light, 900)]),
            digital: HashMap::from([(DigitalChannel::Leak, true), (DigitalChannel::Motion, false)]),
            environment: EnvironmentReading {
                temperature_c: 22.0,
                humidity_pct: 55.0,
                battery_pct: 90.0,
            },
            reads: 0,
        };
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }
}

impl ScriptedSource {
    pub fn with_analog(self, channel: AnalogChannel, raw: i32) -> Self {
        self.state.borrow_mut().analog.insert(channel, raw);
        self
    }

    pub fn with_digital(self, channel: DigitalChannel, high: bool) -> Self {
        self.state.borrow_mut().digital.insert(channel, high);
        self
    }

    pub fn with_environment(self, env: EnvironmentReading) -> Self {
        self.state.borrow_mut().environment = env;
        self
    }
}

impl SensorSource for ScriptedSource {
    fn read_analog(&mut self, channel: AnalogChannel) -> i32 {
        let mut state = self.state.borrow_mut();
        state.reads += 1;
        state.analog.get(&channel).copied().unwrap_or(0)
    }

    fn read_digital(&mut self, channel: DigitalChannel) -> bool {
        self.state.borrow().digital.get(&channel).copied().unwrap_or(false)
    }

    fn read_environment(&mut self, _now_ms: u64) -> EnvironmentReading {
        self.state.borrow().environment
    }
}

// ──────────────────────────────────────────────
// Saídas locais e host
// ──────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct IndicatorLog {
    pub led: bool,
    /// Um item por padrão disparado; `true` = com buzzer
    pub patterns: Vec<bool>,
    /// Um item por sequência de piscadas
    pub blinks: Vec<u32>,
}

#[derive(Clone, Default)]
pub struct RecordingIndicator {
    pub log: Rc<RefCell<IndicatorLog>>,
}

impl Indicator for RecordingIndicator {
    fn set_status_led(&mut self, on: bool) {
        self.log.borrow_mut().led = on;
    }

    fn alert_pattern(&mut self, buzzer: bool) {
        self.log.borrow_mut().patterns.push(buzzer);
    }

    fn blink(&mut self, times: u32) {
        let mut log = self.log.borrow_mut();
        log.blinks.push(times);
        log.led = false;
    }
}

pub struct FixedStats(pub u64);

impl HostStats for FixedStats {
    fn free_memory(&mut self) -> u64 {
        self.0
    }
}
