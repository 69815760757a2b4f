// Tratamento de erros ergonômico
use anyhow::{Context, Result};

// Sinalizador de cancelamento compartilhado com o handler de Ctrl+C
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

// Medição de tempo (RTT) e pausas entre sondas
use std::time::{Duration, Instant};

use crate::icmp::{self, MatchResult};
use crate::transport::{RecvOutcome, Transport};

/// Buffer de recepção (MTU típica)
const RECV_BUFFER_LEN: usize = 1500;

/// Parâmetros de uma sessão de ping.
pub struct SessionConfig {
    /// Quantidade de sondas a enviar.
    pub count: u16,
    /// Prazo de espera pela resposta de cada sonda.
    pub timeout: Duration,
    /// Pausa entre sondas (1s no uso normal; zero nos testes).
    pub interval: Duration,
    /// Dados carregados em cada Echo Request.
    pub payload: Vec<u8>,
}

/// Desfecho de uma sonda individual.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Resposta casada dentro do prazo.
    Reply { rtt_ms: u64, bytes: usize },
    /// Prazo expirado sem resposta casada.
    Timeout,
}

/// Estatísticas acumuladas de uma execução. Valor próprio devolvido por
/// `Session::run`, sem estado global; um registro por sonda concluída.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub sent: u64,
    pub received: u64,
    total_rtt_ms: u64,
    min_rtt_ms: u64,
    max_rtt_ms: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            sent: 0,
            received: 0,
            total_rtt_ms: 0,
            min_rtt_ms: u64::MAX,
            max_rtt_ms: 0,
        }
    }

    /// Registra o desfecho de uma sonda. Min/max/total só acumulam sobre
    /// sucessos; um timeout conta apenas como enviada e perdida.
    pub fn record(&mut self, outcome: &ProbeOutcome) {
        self.sent += 1;
        if let ProbeOutcome::Reply { rtt_ms, .. } = *outcome {
            self.received += 1;
            self.total_rtt_ms += rtt_ms;
            self.min_rtt_ms = self.min_rtt_ms.min(rtt_ms);
            self.max_rtt_ms = self.max_rtt_ms.max(rtt_ms);
        }
    }

    pub fn lost(&self) -> u64 {
        self.sent - self.received
    }

    /// Percentual de perda em divisão inteira (0 quando nada foi enviado).
    pub fn loss_percent(&self) -> u64 {
        if self.sent == 0 {
            return 0;
        }
        self.lost() * 100 / self.sent
    }

    pub fn min_rtt_ms(&self) -> Option<u64> {
        (self.received > 0).then_some(self.min_rtt_ms)
    }

    pub fn max_rtt_ms(&self) -> Option<u64> {
        (self.received > 0).then_some(self.max_rtt_ms)
    }

    /// Média = total / recebidas (divisão inteira).
    pub fn avg_rtt_ms(&self) -> Option<u64> {
        (self.received > 0).then(|| self.total_rtt_ms / self.received)
    }

    pub fn total_rtt_ms(&self) -> u64 {
        self.total_rtt_ms
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

/// Laço de sondas: uma requisição pendente por vez, sequence crescendo de
/// 1 em 1 a partir de 1, independentemente do desfecho de cada sonda.
pub struct Session {
    /// Identifier do Echo Request, fixo pela vida da sessão.
    ident: u16,
    config: SessionConfig,
    /// Falso quando o usuário pediu interrupção; checado entre sondas e
    /// antes de cada pausa.
    running: Arc<AtomicBool>,
}

impl Session {
    pub fn new(ident: u16, config: SessionConfig, running: Arc<AtomicBool>) -> Self {
        Self { ident, config, running }
    }

    pub fn ident(&self) -> u16 {
        self.ident
    }

    /// Executa a sessão inteira sobre `transport`, chamando `observe` com
    /// o desfecho de cada sonda (é aí que o chamador imprime suas linhas).
    /// Falha de envio ou erro de I/O que não seja timeout aborta a
    /// execução inteira; timeout é perda daquela sonda e o laço segue.
    pub fn run<T, F>(&self, transport: &mut T, mut observe: F) -> Result<Stats>
    where
        T: Transport + ?Sized,
        F: FnMut(u16, &ProbeOutcome),
    {
        let mut stats = Stats::new();

        for seq in 1..=self.config.count {
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            let outcome = self.probe(transport, seq)?;
            stats.record(&outcome);
            observe(seq, &outcome);

            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            // Sem pausa depois da última sonda
            if seq < self.config.count {
                std::thread::sleep(self.config.interval);
            }
        }

        Ok(stats)
    }

    /// Uma sonda: envia o Echo Request de número `seq` e espera a resposta
    /// casada até o prazo. Datagramas que chegam mas não casam (tráfego
    /// ICMP de terceiros, respostas de outras sondas, pacotes curtos) não
    /// encerram a espera — o laço continua lendo até o prazo vencer.
    fn probe<T>(&self, transport: &mut T, seq: u16) -> Result<ProbeOutcome>
    where
        T: Transport + ?Sized,
    {
        let pkt = icmp::build_echo_request(self.ident, seq, &self.config.payload);

        let sent_at = Instant::now();
        transport
            .send(&pkt)
            .with_context(|| format!("Falha ao enviar a sonda icmp_seq={seq}"))?;

        let deadline = sent_at + self.config.timeout;
        let mut buf = [0u8; RECV_BUFFER_LEN];

        loop {
            let outcome = transport
                .recv_deadline(&mut buf, deadline)
                .with_context(|| format!("Erro de leitura aguardando icmp_seq={seq}"))?;

            let n = match outcome {
                RecvOutcome::TimedOut => return Ok(ProbeOutcome::Timeout),
                RecvOutcome::Data(n) => n,
            };

            match icmp::decode_and_match(&buf[..n], self.ident, seq) {
                MatchResult::Matched { bytes } => {
                    return Ok(ProbeOutcome::Reply {
                        rtt_ms: sent_at.elapsed().as_millis() as u64,
                        bytes,
                    });
                }
                MatchResult::NotMatched | MatchResult::TooShort => continue,
            }
        }
    }
}
