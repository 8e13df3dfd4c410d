//! Sensores simulados e saídas locais via log.
//!
//! Reproduz a bancada de simulação: o MQ2 faz random walk no ADC, o LDR segue
//! um ciclo lento com ruído, vazamento e movimento são eventos aleatórios
//! raros, e temperatura/umidade/bateria seguem senoides lentas.

use crate::hal::{AnalogChannel, DigitalChannel, EnvironmentReading, Indicator, SensorSource};
use rand::Rng;
use rand::rngs::ThreadRng;
use tracing::{debug, info, warn};

/// Probabilidade por leitura de o PIR ver movimento.
const MOTION_PROBABILITY: f64 = 0.15;
/// Probabilidade por leitura de um vazamento começar / terminar.
const LEAK_START_PROBABILITY: f64 = 0.005;
const LEAK_STOP_PROBABILITY: f64 = 0.2;

pub struct SimulatedSource {
    rng: ThreadRng,
    mq2_raw: i32,
    leaking: bool,
    light_phase: f64,
}

impl SimulatedSource {
    pub fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            mq2_raw: 300,
            leaking: false,
            light_phase: 0.0,
        }
    }
}

impl SensorSource for SimulatedSource {
    fn read_analog(&mut self, channel: AnalogChannel) -> i32 {
        match channel {
            AnalogChannel::AirQuality => {
                self.mq2_raw = (self.mq2_raw + self.rng.gen_range(-40..=40)).clamp(0, 1200);
                self.mq2_raw
            }
            AnalogChannel::Light => {
                self.light_phase += 0.01;
                let base = 2048.0 + 1800.0 * self.light_phase.sin();
                base as i32 + self.rng.gen_range(-50..=50)
            }
        }
    }

    fn read_digital(&mut self, channel: DigitalChannel) -> bool {
        match channel {
            // Botão com pull-up: LOW enquanto "vaza"
            DigitalChannel::Leak => {
                let flip = if self.leaking {
                    LEAK_STOP_PROBABILITY
                } else {
                    LEAK_START_PROBABILITY
                };
                if self.rng.gen_bool(flip) {
                    self.leaking = !self.leaking;
                }
                !self.leaking
            }
            DigitalChannel::Motion => self.rng.gen_bool(MOTION_PROBABILITY),
        }
    }

    fn read_environment(&mut self, now_ms: u64) -> EnvironmentReading {
        let t = now_ms as f64;
        EnvironmentReading {
            temperature_c: (25.0 + 3.0 * (t / 600_000.0).sin()) as f32,
            humidity_pct: (60.0 + 10.0 * (t / 900_000.0).sin()) as f32,
            battery_pct: (85.0 + 10.0 * (t / 1_800_000.0).sin()) as f32,
        }
    }
}

/// LED e buzzer representados no log.
#[derive(Default)]
pub struct LogIndicator {
    led_on: bool,
}

impl Indicator for LogIndicator {
    fn set_status_led(&mut self, on: bool) {
        if self.led_on != on {
            info!("LED de status: {}", if on { "ON" } else { "OFF" });
        }
        self.led_on = on;
    }

    fn alert_pattern(&mut self, buzzer: bool) {
        if buzzer {
            warn!("🔔 Alerta local: LED x3 + buzzer");
        } else {
            info!("Alerta local: LED x3");
        }
    }

    fn blink(&mut self, times: u32) {
        debug!("LED de status: {times} piscada(s)");
        self.led_on = false;
    }
}
