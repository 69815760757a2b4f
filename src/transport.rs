// Tratamento de erros ergonômico
use anyhow::{Context, Result};

// Criação e configuração de sockets de baixo nível
use socket2::{Domain, Protocol, Socket, Type};

// Erros de I/O (timeout, would-block, etc.)
use std::io::{self, Read};

// Endereço de destino
use std::net::SocketAddr;

// Prazo absoluto de recepção
use std::time::Instant;

/// Resultado de uma espera de recepção com prazo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvOutcome {
    /// Chegaram `n` bytes antes do prazo.
    Data(usize),
    /// O prazo expirou sem nenhum datagrama.
    TimedOut,
}

/// Transporte de datagramas para o laço de sondas: envia bytes e espera
/// bytes até um prazo absoluto. O timeout não é erro — é um resultado
/// esperado; qualquer outra falha de I/O é devolvida como erro.
pub trait Transport {
    fn send(&mut self, packet: &[u8]) -> io::Result<()>;

    fn recv_deadline(&mut self, buf: &mut [u8], deadline: Instant) -> io::Result<RecvOutcome>;
}

/// Transporte real: socket ICMP RAW conectado ao destino.
/// Requer privilégios elevados (root no Unix, Administrador no Windows).
pub struct SocketTransport {
    sock: Socket,
}

impl SocketTransport {
    /// Abre um socket ICMPv4 RAW conectado a `dst`, com o buffer de envio
    /// (SO_SNDBUF) dimensionado em `send_buffer_bytes`.
    pub fn open(dst: SocketAddr, send_buffer_bytes: usize) -> Result<Self> {
        // Domain::IPV4 -> AF_INET
        // Type::RAW -> SOCK_RAW (necessário para ICMP)
        // Protocol::ICMPV4 -> IPPROTO_ICMP
        let sock = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))
            .context("Falha ao criar socket RAW. Verifique se está rodando com privilégios.")?;

        sock.set_send_buffer_size(send_buffer_bytes)
            .context("Falha ao configurar o buffer de envio (SO_SNDBUF)")?;

        // Conectado: send() sem endereço e recv() filtrado pelo destino
        sock.connect(&dst.into())
            .with_context(|| format!("Falha ao conectar o socket a {dst}"))?;

        Ok(Self { sock })
    }
}

impl Transport for SocketTransport {
    fn send(&mut self, packet: &[u8]) -> io::Result<()> {
        self.sock.send(packet).map(|_| ())
    }

    fn recv_deadline(&mut self, buf: &mut [u8], deadline: Instant) -> io::Result<RecvOutcome> {
        // O timeout de leitura do socket é reajustado a cada chamada para
        // o tempo restante até o prazo; prazo já vencido nem bloqueia.
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(RecvOutcome::TimedOut);
        }
        self.sock.set_read_timeout(Some(remaining))?;

        match self.sock.read(buf) {
            Ok(n) => Ok(RecvOutcome::Data(n)),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock
                || e.kind() == io::ErrorKind::TimedOut =>
            {
                Ok(RecvOutcome::TimedOut)
            }
            Err(e) => Err(e),
        }
    }
}
