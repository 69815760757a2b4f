/// Tamanho do cabeçalho ICMP (type, code, checksum, identifier, sequence).
pub const ICMP_HEADER_LEN: usize = 8;

/// Resultado da decodificação de um datagrama recebido.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    /// Echo Reply (type=0, code=0) com identifier e sequence esperados.
    /// `bytes` é o tamanho da parte ICMP (sem o cabeçalho IP).
    Matched { bytes: usize },
    /// Datagrama decodificável, mas não é a resposta desta sonda
    /// (outro tipo, outro código, outro identifier ou outra sequence).
    NotMatched,
    /// Curto demais para conter um cabeçalho ICMP completo.
    TooShort,
}

/// Calcula o checksum da Internet (RFC 1071).
/// Soma de palavras de 16 bits big-endian; byte ímpar final vira o byte
/// alto de uma palavra de preenchimento. Dobra os carries até caber em
/// 16 bits e devolve o complemento de um.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;

    let mut words = data.chunks_exact(2);
    for w in &mut words {
        sum = sum.wrapping_add(u16::from_be_bytes([w[0], w[1]]) as u32);
    }
    if let &[last] = words.remainder() {
        sum = sum.wrapping_add((last as u32) << 8);
    }

    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}

/// Monta um pacote ICMPv4 Echo Request (type=8, code=0).
pub fn build_echo_request(ident: u16, seq: u16, payload: &[u8]) -> Vec<u8> {
    let mut pkt = Vec::with_capacity(ICMP_HEADER_LEN + payload.len());

    // Type=8 (Echo Request), Code=0, checksum provisório em zero
    pkt.extend_from_slice(&[8, 0, 0, 0]);

    // Identifier e Sequence (big-endian)
    pkt.extend_from_slice(&ident.to_be_bytes());
    pkt.extend_from_slice(&seq.to_be_bytes());

    pkt.extend_from_slice(payload);

    // Checksum sobre o buffer inteiro com o campo zerado
    let csum = checksum(&pkt);
    pkt[2..4].copy_from_slice(&csum.to_be_bytes());

    pkt
}

/// Comprimento do cabeçalho IPv4, se o datagrama começar com um.
/// Alguns SOs entregam o pacote já sem o cabeçalho IP; nesse caso None.
fn ip_header_len(datagram: &[u8]) -> Option<usize> {
    if datagram.len() < 20 || (datagram[0] >> 4) != 4 {
        return None;
    }
    // IHL em palavras de 32 bits; menor que 20 bytes é inválido
    let ihl = (datagram[0] & 0x0F) as usize * 4;
    if ihl < 20 { None } else { Some(ihl) }
}

/// Decodifica um datagrama recebido e verifica se é a resposta da sonda
/// corrente: Echo Reply (type=0, code=0) com `ident` e `seq` esperados.
/// O deslocamento do ICMP é calculado pelo IHL real do cabeçalho IP, não
/// assumido fixo em 20 bytes (opções IP deslocariam os campos).
pub fn decode_and_match(datagram: &[u8], ident: u16, seq: u16) -> MatchResult {
    let start = ip_header_len(datagram).unwrap_or(0);

    if datagram.len() < start + ICMP_HEADER_LEN {
        return MatchResult::TooShort;
    }

    let icmp = &datagram[start..];
    let r_ident = u16::from_be_bytes([icmp[4], icmp[5]]);
    let r_seq = u16::from_be_bytes([icmp[6], icmp[7]]);

    if icmp[0] == 0 && icmp[1] == 0 && r_ident == ident && r_seq == seq {
        MatchResult::Matched { bytes: icmp.len() }
    } else {
        MatchResult::NotMatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Envolve um pacote ICMP num cabeçalho IPv4 mínimo (20 bytes, sem opções).
    fn with_ip_header(icmp: &[u8]) -> Vec<u8> {
        let mut datagram = vec![0u8; 20];
        datagram[0] = 0x45;
        datagram.extend_from_slice(icmp);
        datagram
    }

    // Resposta válida para um request: mesmo corpo, type trocado para 0.
    fn reply_from(request: &[u8]) -> Vec<u8> {
        let mut icmp = request.to_vec();
        icmp[0] = 0;
        with_ip_header(&icmp)
    }

    #[test]
    fn test_build_echo_request_layout() {
        let pkt = build_echo_request(0x1234, 7, b"PingData");

        assert_eq!(pkt.len(), 8 + 8);
        assert_eq!(pkt[0], 8);
        assert_eq!(pkt[1], 0);
        assert_eq!(u16::from_be_bytes([pkt[4], pkt[5]]), 0x1234);
        assert_eq!(u16::from_be_bytes([pkt[6], pkt[7]]), 7);
        assert_eq!(&pkt[8..], b"PingData");
    }

    #[test]
    fn test_checksum_self_verifying() {
        // O checksum de uma mensagem corretamente preenchida é zero
        // (soma dobrada igual a 0xFFFF antes do complemento).
        let payloads: [&[u8]; 5] = [b"", b"a", b"ab", b"PingData", b"payload impar"];
        for payload in payloads {
            let pkt = build_echo_request(0xBEEF, 42, payload);
            assert_eq!(checksum(&pkt), 0, "payload {payload:?}");
        }
    }

    #[test]
    fn test_checksum_odd_trailing_byte_is_high_byte() {
        // 0x1234 + 0xAB00 de preenchimento, complementado
        assert_eq!(checksum(&[0x12, 0x34, 0xAB]), !(0x1234u16 + 0xAB00u16));
    }

    #[test]
    fn test_encode_length_even_and_odd() {
        for n in [0usize, 1, 2, 31, 32, 33] {
            let payload = vec![0x5A; n];
            let pkt = build_echo_request(1, 1, &payload);
            assert_eq!(pkt.len(), 8 + n);
        }
    }

    #[test]
    fn test_decode_too_short() {
        // Sem cabeçalho IP: menos de 8 bytes não contém um cabeçalho ICMP
        for n in 0..8 {
            let datagram = vec![0xFFu8; n];
            assert_eq!(
                decode_and_match(&datagram, 1, 1),
                MatchResult::TooShort,
                "tamanho {n}"
            );
        }

        // Com cabeçalho IPv4 de 20 bytes: menos de 28 bytes no total
        for n in 20..28 {
            let mut datagram = vec![0u8; n];
            datagram[0] = 0x45;
            assert_eq!(
                decode_and_match(&datagram, 1, 1),
                MatchResult::TooShort,
                "tamanho {n}"
            );
        }
    }

    #[test]
    fn test_decode_matched() {
        let request = build_echo_request(0x1234, 3, b"PingData");
        let datagram = reply_from(&request);

        assert_eq!(
            decode_and_match(&datagram, 0x1234, 3),
            MatchResult::Matched { bytes: request.len() }
        );
    }

    #[test]
    fn test_decode_single_field_mismatch() {
        let request = build_echo_request(0x1234, 3, b"PingData");

        // Identifier errado
        let datagram = reply_from(&request);
        assert_eq!(decode_and_match(&datagram, 0x1235, 3), MatchResult::NotMatched);

        // Sequence errada
        assert_eq!(decode_and_match(&datagram, 0x1234, 4), MatchResult::NotMatched);

        // Type errado (o próprio Echo Request ecoado de volta)
        let datagram = with_ip_header(&request);
        assert_eq!(decode_and_match(&datagram, 0x1234, 3), MatchResult::NotMatched);

        // Code diferente de zero
        let mut icmp = request.clone();
        icmp[0] = 0;
        icmp[1] = 1;
        let datagram = with_ip_header(&icmp);
        assert_eq!(decode_and_match(&datagram, 0x1234, 3), MatchResult::NotMatched);
    }

    #[test]
    fn test_decode_respects_ip_options() {
        // Cabeçalho IPv4 com opções: IHL=6 (24 bytes) desloca o ICMP
        let mut icmp = build_echo_request(0x1234, 3, b"PingData");
        icmp[0] = 0;
        let mut datagram = vec![0u8; 24];
        datagram[0] = 0x46;
        datagram.extend_from_slice(&icmp);

        assert_eq!(
            decode_and_match(&datagram, 0x1234, 3),
            MatchResult::Matched { bytes: icmp.len() }
        );
    }

    #[test]
    fn test_decode_bare_icmp_without_ip_header() {
        // Alguns SOs removem o cabeçalho IP antes de entregar
        let mut icmp = build_echo_request(0x1234, 3, b"PingData");
        icmp[0] = 0;

        assert_eq!(
            decode_and_match(&icmp, 0x1234, 3),
            MatchResult::Matched { bytes: icmp.len() }
        );
    }
}
