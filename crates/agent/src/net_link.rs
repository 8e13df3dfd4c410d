//! Link de rede do host.
//!
//! `connect` testa o caminho até o broker com um TCP connect curto (mesma
//! técnica da medição de latência) e guarda o endereço local usado. A checagem
//! de link depois disso é só de rota: um socket UDP "conectado" ao broker não
//! envia nada, mas falha se o host não tiver rota.
//!
//! Cada `connect` gasta no máximo `probe_timeout`, somando todos os endereços
//! resolvidos.

use crate::hal::Transport;
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant};
use tracing::debug;

const WIRELESS_STATS: &str = "/proc/net/wireless";

pub struct TcpLink {
    probe_timeout: Duration,
    peer: Option<SocketAddr>,
    local: Option<SocketAddr>,
}

impl TcpLink {
    /// `probe_timeout` é o orçamento de uma tentativa de link
    /// (`network.link_retry_delay_ms`).
    pub fn new(probe_timeout: Duration) -> Self {
        Self {
            probe_timeout: probe_timeout.max(Duration::from_millis(1)),
            peer: None,
            local: None,
        }
    }

    /// Atualiza o endereço local a partir da checagem de rota. A perda de rota
    /// é registrada uma vez só; o aviso de link caído fica com a conectividade.
    fn record_route(&mut self, route: io::Result<SocketAddr>) -> bool {
        match route {
            Ok(local) => {
                self.local = Some(local);
                true
            }
            Err(e) => {
                if self.local.take().is_some() {
                    debug!("Rota para o broker indisponível: {e}");
                }
                false
            }
        }
    }
}

impl Transport for TcpLink {
    fn connect(&mut self, host: &str, port: u16) -> bool {
        let addrs = match (host, port).to_socket_addrs() {
            Ok(addrs) => addrs.collect::<Vec<_>>(),
            Err(e) => {
                debug!("DNS falhou para {host}: {e}");
                return false;
            }
        };

        let deadline = Instant::now() + self.probe_timeout;
        for addr in addrs {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!("Orçamento da sonda esgotado antes de {addr}");
                break;
            }
            match TcpStream::connect_timeout(&addr, remaining) {
                Ok(stream) => {
                    self.local = stream.local_addr().ok();
                    self.peer = Some(addr);
                    return true;
                }
                Err(e) => debug!("Sonda TCP para {addr} falhou: {e}"),
            }
        }

        self.local = None;
        false
    }

    fn is_connected(&mut self) -> bool {
        let Some(peer) = self.peer else {
            return false;
        };
        let bind = if peer.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let route = UdpSocket::bind(bind).and_then(|sock| {
            sock.connect(peer)?;
            sock.local_addr()
        });
        self.record_route(route)
    }

    fn signal_strength(&self) -> i32 {
        std::fs::read_to_string(WIRELESS_STATS)
            .ok()
            .and_then(|content| parse_wireless_level(&content))
            .unwrap_or(0)
    }

    fn local_address(&self) -> String {
        self.local
            .map(|addr| addr.ip().to_string())
            .unwrap_or_default()
    }
}

/// Extrai o nível de sinal (dBm) da primeira interface de `/proc/net/wireless`.
///
/// ```text
/// Inter-| sta-|   Quality        |   Discarded packets
///  face | tus | link level noise |  nwid  crypt   frag
///  wlan0: 0000   54.  -56.  -256        0      0      0
/// ```
fn parse_wireless_level(content: &str) -> Option<i32> {
    let line = content.lines().skip(2).find(|l| l.contains(':'))?;
    let (_, stats) = line.split_once(':')?;
    let level = stats.split_whitespace().nth(2)?;
    level.trim_end_matches('.').parse::<f32>().ok().map(|v| v as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn parses_wireless_level() {
        let content = "Inter-| sta-|   Quality        |   Discarded packets               | Missed | WE\n \
                       face | tus | link level noise |  nwid  crypt   frag  retry   misc | beacon | 22\n \
                       wlan0: 0000   54.  -56.  -256        0      0      0      0     12        0\n";
        assert_eq!(parse_wireless_level(content), Some(-56));
    }

    #[test]
    fn no_wireless_interface() {
        let content = "Inter-| sta-|   Quality\n face | tus | link level noise\n";
        assert_eq!(parse_wireless_level(content), None);
    }

    #[test]
    fn unresolved_link_is_down() {
        let mut link = TcpLink::new(Duration::from_millis(500));
        assert!(!link.is_connected());
        assert!(link.local_address().is_empty());
    }

    #[test]
    fn connect_stays_within_probe_budget() {
        let budget = Duration::from_millis(300);
        let mut link = TcpLink::new(budget);
        let start = Instant::now();
        // TEST-NET-1: sem resposta, ou sem rota
        assert!(!link.connect("192.0.2.1", 1883));
        assert!(start.elapsed() < budget + Duration::from_millis(200));
        assert!(link.local_address().is_empty());
    }

    /// Destino de log em memória para contar mensagens.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn route_loss_is_logged_once() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let mut link = TcpLink::new(Duration::from_millis(500));
        link.peer = Some("192.0.2.1:1883".parse().unwrap());
        assert!(link.record_route(Ok("10.0.0.5:40000".parse().unwrap())));
        assert_eq!(link.local_address(), "10.0.0.5");

        tracing::subscriber::with_default(subscriber, || {
            // Um segundo de ticks com a rota caída
            for _ in 0..100 {
                let lost = io::Error::new(io::ErrorKind::NetworkUnreachable, "unreachable");
                assert!(!link.record_route(Err(lost)));
            }
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output.matches("Rota para o broker indisponível").count(), 1);
        assert!(!output.contains("WARN"));
        assert!(link.local_address().is_empty());
    }
}
