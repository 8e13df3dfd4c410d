//! # Monitor Agent
//!
//! Amostra os sensores do ambiente, avalia thresholds e publica telemetria,
//! alertas e heartbeat via MQTT. Comandos chegam pelo tópico de controle.
//!
//! ## Uso
//! ```bash
//! monitor_agent                 # Usa config.toml ao lado do executável
//! RUST_LOG=debug monitor_agent  # Log detalhado (publicações, polls)
//! ```

mod connectivity;
mod dispatcher;
#[cfg(test)]
mod fakes;
mod hal;
mod monitor;
mod mqtt;
mod net_link;
mod publisher;
mod sampler;
mod scheduler;
mod simulated;

use connectivity::ConnectivityManager;
use dispatcher::CommandDispatcher;
use hal::MonotonicClock;
use monitor::HostMonitor;
use monitor_core::alerts::AlertEngine;
use monitor_core::config::AppConfig;
use monitor_core::types::{MotionTimer, PublishCadence, SystemCounters};
use mqtt::MqttBroker;
use net_link::TcpLink;
use publisher::TelemetryPublisher;
use sampler::SensorSampler;
use scheduler::{Agent, Scheduler};
use simulated::{LogIndicator, SimulatedSource};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};

fn main() -> ExitCode {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // ── Carregar config ──
    let config_path = AppConfig::default_path();
    let config = AppConfig::load(&config_path);

    // Salva config padrão se não existir
    if !config_path.exists() {
        if let Err(e) = config.save(&config_path) {
            warn!("Não foi possível salvar config padrão: {e}");
        }
    }

    for problem in config.validate() {
        warn!("Config: {problem}");
    }

    // ── Broker ──
    let broker = match MqttBroker::new(&config.broker) {
        Ok(broker) => broker,
        Err(e) => {
            error!("Falha ao preparar cliente MQTT: {e}");
            return ExitCode::FAILURE;
        }
    };

    let intervals = &config.intervals;
    let link = TcpLink::new(Duration::from_millis(config.network.link_retry_delay_ms));
    let agent = Agent {
        clock: Box::new(MonotonicClock::new()),
        sampler: SensorSampler::new(Box::new(SimulatedSource::new()), config.calibration.clone()),
        engine: AlertEngine::new(config.thresholds.clone()),
        conn: ConnectivityManager::new(Box::new(link), Box::new(broker), &config),
        publisher: TelemetryPublisher::new(
            config.device.clone(),
            config.topics.clone(),
            Box::new(HostMonitor::new()),
        ),
        indicator: Box::new(LogIndicator::default()),
        counters: SystemCounters::default(),
        cadence: PublishCadence::new(
            intervals.sample_ms,
            intervals.publish_ms,
            intervals.heartbeat_ms,
            intervals.motion_check_ms,
        ),
        motion: MotionTimer::default(),
        last_snapshot: None,
    };
    info!("Agente inicializado");

    // ── Banner ──
    let scheme = if config.broker.tls { "mqtts" } else { "mqtt" };
    println!();
    println!("══════════════════════════════════════════════");
    println!("   🏠 MONITOR AGENT – ATIVO (Rust)");
    println!("══════════════════════════════════════════════");
    println!("  Dispositivo: {} ({})", config.device.id, config.device.location);
    println!("  Broker:      {scheme}://{}:{}", config.broker.host, config.broker.port);
    println!("  Dados:       {} a cada {:.1}s", config.topics.sensor_data, intervals.publish_ms as f64 / 1000.0);
    println!("  Controle:    {}", config.topics.control);
    println!("══════════════════════════════════════════════");
    println!();

    // ── Loop principal ──
    let mut scheduler = Scheduler::new(
        agent,
        CommandDispatcher::new(config.topics.control.clone()),
        intervals.tick_ms,
    );
    scheduler.run();

    let counters = scheduler.agent().counters;
    info!(
        "Reinício solicitado | publicados {} | erros {} | descartados {}",
        counters.publish_count, counters.error_count, counters.malformed_count
    );

    std::thread::sleep(Duration::from_millis(intervals.reboot_delay_ms));
    restart()
}

/// Substitui o processo atual por uma nova instância do executável.
fn restart() -> ExitCode {
    let exe = match std::env::current_exe() {
        Ok(exe) => exe,
        Err(e) => {
            error!("Executável atual não encontrado: {e}");
            return ExitCode::FAILURE;
        }
    };
    let mut command = std::process::Command::new(exe);
    command.args(std::env::args_os().skip(1));

    relaunch(command)
}

#[cfg(unix)]
fn relaunch(mut command: std::process::Command) -> ExitCode {
    use std::os::unix::process::CommandExt;
    // `exec` só retorna em caso de erro
    let e = command.exec();
    error!("Falha ao reiniciar: {e}");
    ExitCode::FAILURE
}

#[cfg(not(unix))]
fn relaunch(mut command: std::process::Command) -> ExitCode {
    match command.spawn() {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Falha ao reiniciar: {e}");
            ExitCode::FAILURE
        }
    }
}
