//! Amostragem dos sensores com calibração e tabela de polaridade.

use crate::hal::{AnalogChannel, DigitalChannel, SensorSource};
use monitor_core::config::CalibrationConfig;
use monitor_core::types::{MotionTimer, SensorSnapshot};
use tracing::debug;

const HUMIDITY_RANGE: (f32, f32) = (0.0, 100.0);
const BATTERY_RANGE: (f32, f32) = (0.0, 100.0);

/// Converte leituras brutas num [`SensorSnapshot`].
pub struct SensorSampler {
    source: Box<dyn SensorSource>,
    calibration: CalibrationConfig,
}

impl SensorSampler {
    pub fn new(source: Box<dyn SensorSource>, calibration: CalibrationConfig) -> Self {
        Self {
            source,
            calibration,
        }
    }

    /// Lê todos os canais. Movimento nesta leitura rearma o timer.
    pub fn read(&mut self, now_ms: u64, motion: &mut MotionTimer) -> SensorSnapshot {
        let cal = &self.calibration;

        let mq2_raw = self.source.read_analog(AnalogChannel::AirQuality);
        let light_raw = self.source.read_analog(AnalogChannel::Light);
        let leak_high = self.source.read_digital(DigitalChannel::Leak);
        let motion_high = self.source.read_digital(DigitalChannel::Motion);
        let env = self.source.read_environment(now_ms);

        let snapshot = SensorSnapshot {
            air_quality: cal.air_quality.map(mq2_raw),
            is_leaking: active(leak_high, cal.leak_active_low),
            motion_detected: active(motion_high, cal.motion_active_low),
            light_level: cal.light.map(light_raw),
            temperature_c: clamp_reading(
                env.temperature_c,
                (cal.temperature_min_c, cal.temperature_max_c),
            ),
            humidity_pct: clamp_reading(env.humidity_pct, HUMIDITY_RANGE),
            battery_pct: clamp_reading(env.battery_pct, BATTERY_RANGE),
            captured_at_ms: now_ms,
        };

        if snapshot.motion_detected {
            motion.observe_motion(now_ms);
        }

        debug!(
            "Sensores | MQ2 raw {} → {} PPM | vazamento {} | movimento {} | luz {} | {:.1}°C {:.1}% | bateria {:.1}%",
            mq2_raw,
            snapshot.air_quality,
            snapshot.is_leaking,
            snapshot.motion_detected,
            snapshot.light_level,
            snapshot.temperature_c,
            snapshot.humidity_pct,
            snapshot.battery_pct
        );

        snapshot
    }
}

fn active(level_high: bool, active_low: bool) -> bool {
    level_high != active_low
}

/// Satura na faixa; NaN vira o limite inferior.
fn clamp_reading(value: f32, (lo, hi): (f32, f32)) -> f32 {
    if value.is_nan() {
        return lo;
    }
    value.clamp(lo, hi)
}
