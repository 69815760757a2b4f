use anyhow::{Context, Result, bail};

/// Configuração vinda da linha de comando.
pub struct PingArgs {
    pub host: String,
    /// -n: quantidade de sondas
    pub count: u16,
    /// -t: prazo de espera por resposta, em segundos
    pub timeout_secs: u64,
    /// -l: tamanho do buffer de envio (SO_SNDBUF), em bytes
    pub send_buffer_bytes: usize,
    pub help: bool,
}

/// Linha de uso única, compartilhada entre a ajuda e o erro de host ausente.
const USAGE: &str = "Uso: mping -h <hostname ou IP> [-n <contagem>] [-t <timeout>] [-l <buffer>]";

pub fn usage() {
    println!("{USAGE}");
    println!("  -h <host>   Hostname ou endereço IP de destino (obrigatório)");
    println!("  -n <n>      Quantidade de sondas a enviar (padrão: 4)");
    println!("  -t <seg>    Timeout por sonda, em segundos (padrão: 1)");
    println!("  -l <bytes>  Tamanho do buffer de envio, em bytes (padrão: 32)");
    println!("  --help      Mostra esta ajuda");
}

pub fn parse() -> Result<PingArgs> {
    parse_from(&std::env::args().collect::<Vec<_>>())
}

fn parse_from(args: &[String]) -> Result<PingArgs> {
    let mut host = None;
    let mut count: u16 = 4;
    let mut timeout_secs: u64 = 1;
    let mut send_buffer_bytes: usize = 32;
    let mut help = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" => {
                host = Some(value_of(args, &mut i, "-h")?.to_string());
            }
            "-n" => {
                count = value_of(args, &mut i, "-n")?
                    .parse()
                    .context("Valor inválido para -n")?;
            }
            "-t" => {
                timeout_secs = value_of(args, &mut i, "-t")?
                    .parse()
                    .context("Valor inválido para -t")?;
            }
            "-l" => {
                send_buffer_bytes = value_of(args, &mut i, "-l")?
                    .parse()
                    .context("Valor inválido para -l")?;
            }
            "--help" => {
                help = true;
            }
            other => {
                bail!("Argumento desconhecido: {other} (use --help)");
            }
        }
        i += 1;
    }

    if help {
        // Host dispensável quando só se pediu a ajuda
        return Ok(PingArgs {
            host: String::new(),
            count,
            timeout_secs,
            send_buffer_bytes,
            help,
        });
    }

    let host = host.context(USAGE)?;
    if count == 0 {
        bail!("O valor de -n deve ser pelo menos 1");
    }
    if timeout_secs == 0 {
        bail!("O valor de -t deve ser pelo menos 1");
    }

    Ok(PingArgs {
        host,
        count,
        timeout_secs,
        send_buffer_bytes,
        help,
    })
}

fn value_of<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str> {
    *i += 1;
    args.get(*i)
        .map(|s| s.as_str())
        .with_context(|| format!("Faltou o valor para {flag}"))
}
