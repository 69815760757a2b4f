// Tratamento de erros ergonômico
use anyhow::{Context, Result};

// Resolução de nomes pelo resolvedor da plataforma
use std::net::{SocketAddr, ToSocketAddrs};

// Sinalizador de cancelamento compartilhado com o handler de Ctrl+C
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use std::time::Duration;

// Módulos locais
mod args;
mod icmp;
mod session;
mod transport;

use session::{ProbeOutcome, Session, SessionConfig};
use transport::SocketTransport;

/// Dados carregados em cada Echo Request.
const PAYLOAD: &[u8] = b"PingData";

/// Pausa fixa entre sondas.
const PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// Programa principal: envia Echo Requests e aguarda Echo Replies.
/// Requer privilégios elevados para abrir o socket RAW.
fn main() -> Result<()> {
    let args = args::parse()?;
    if args.help {
        args::usage();
        return Ok(());
    }

    // Resolve o host pelo resolvedor da plataforma; só IPv4 interessa aqui
    let addr: SocketAddr = (args.host.as_str(), 0)
        .to_socket_addrs()
        .with_context(|| format!("Erro ao resolver {}", args.host))?
        .find(|a| a.is_ipv4())
        .with_context(|| format!("{} não resolve para um endereço IPv4", args.host))?;
    let ip = addr.ip();

    // Ctrl+C apenas sinaliza; o laço encerra entre sondas e o socket é
    // fechado normalmente na saída
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Erro ao configurar handler de Ctrl+C")?;

    let mut transport = SocketTransport::open(addr, args.send_buffer_bytes)?;

    // Identifier fixo pela vida da sessão, derivado do PID mascarado a
    // 16 bits; a sessão só conhece o valor, não a origem dele
    let ident = (std::process::id() & 0xFFFF) as u16;

    let config = SessionConfig {
        count: args.count,
        timeout: Duration::from_secs(args.timeout_secs),
        interval: PROBE_INTERVAL,
        payload: PAYLOAD.to_vec(),
    };
    let sess = Session::new(ident, config, running.clone());

    println!("Ping {} [{}] com {} bytes de dados:", args.host, ip, PAYLOAD.len());

    let stats = sess.run(&mut transport, |seq, outcome| match outcome {
        ProbeOutcome::Reply { rtt_ms, bytes } => {
            println!("Resposta de {ip}: bytes={bytes} icmp_seq={seq} tempo={rtt_ms}ms");
        }
        ProbeOutcome::Timeout => {
            println!("Tempo esgotado para icmp_seq={seq}.");
        }
    })?;

    if !running.load(Ordering::SeqCst) {
        println!("\nPrograma interrompido.");
    }

    println!("\n--- estatísticas de ping para {} ---", args.host);
    println!(
        "Pacotes: enviados = {}, recebidos = {}, perdidos = {} ({}% de perda)",
        stats.sent,
        stats.received,
        stats.lost(),
        stats.loss_percent()
    );

    // Só faz sentido falar de RTT quando alguma resposta chegou
    if let (Some(min), Some(avg), Some(max)) =
        (stats.min_rtt_ms(), stats.avg_rtt_ms(), stats.max_rtt_ms())
    {
        println!("rtt min/med/max = {min}/{avg}/{max} ms");
    }

    Ok(())
}
