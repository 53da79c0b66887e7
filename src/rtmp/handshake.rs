// RTMP handshake utils
//
// Plain RTMP v3 handshake: the signatures carry no digest, S2 echoes C1
// and C2 echoes S1.

use rand::{rngs::StdRng, RngCore, SeedableRng};

use super::{RTMP_SIG_SIZE, RTMP_VERSION};

/// Checks the version byte received as C0 or S0
pub fn rtmp_check_version(version: u8) -> bool {
    version == RTMP_VERSION
}

/// Fills a handshake signature:
/// 4 byte timestamp (zeroed), 4 zero bytes, 1528 random bytes
fn fill_signature(signature: &mut [u8]) {
    let mut rng = StdRng::from_os_rng();

    rng.fill_bytes(&mut signature[8..]);
}

/// Generates the C0 + C1 bytes to start a client handshake
pub fn generate_c0_c1() -> Vec<u8> {
    let mut bytes: Vec<u8> = vec![0; 1 + RTMP_SIG_SIZE];

    bytes[0] = RTMP_VERSION;
    fill_signature(&mut bytes[1..]);

    bytes
}

/// Generates the full S0 + S1 + S2 server handshake response
/// client_signature - The C1 signature received from the client (echoed as S2)
pub fn generate_s0_s1_s2(client_signature: &[u8]) -> Result<Vec<u8>, ()> {
    if client_signature.len() != RTMP_SIG_SIZE {
        return Err(());
    }

    let mut bytes: Vec<u8> = vec![0; 1 + RTMP_SIG_SIZE + RTMP_SIG_SIZE];

    bytes[0] = RTMP_VERSION;
    fill_signature(&mut bytes[1..1 + RTMP_SIG_SIZE]);
    bytes[1 + RTMP_SIG_SIZE..].copy_from_slice(client_signature);

    Ok(bytes)
}

/// Generates the C2 bytes finishing a client handshake
/// server_signature - The S1 signature received from the server (echoed as C2)
pub fn generate_c2(server_signature: &[u8]) -> Result<Vec<u8>, ()> {
    if server_signature.len() != RTMP_SIG_SIZE {
        return Err(());
    }

    Ok(server_signature.to_vec())
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_c0_c1() {
        let c0_c1 = generate_c0_c1();

        assert_eq!(c0_c1.len(), 1 + RTMP_SIG_SIZE);
        assert_eq!(c0_c1[0], RTMP_VERSION);
        // Timestamp + zero block untouched
        assert_eq!(&c0_c1[1..9], &[0; 8]);
    }

    #[test]
    fn test_generate_s0_s1_s2_echoes_c1() {
        let c0_c1 = generate_c0_c1();
        let c1 = &c0_c1[1..];

        let s0_s1_s2 = generate_s0_s1_s2(c1).unwrap();

        assert_eq!(s0_s1_s2.len(), 1 + RTMP_SIG_SIZE + RTMP_SIG_SIZE);
        assert_eq!(s0_s1_s2[0], RTMP_VERSION);
        assert_eq!(&s0_s1_s2[1 + RTMP_SIG_SIZE..], c1);
    }

    #[test]
    fn test_generate_c2_echoes_s1() {
        let c0_c1 = generate_c0_c1();
        let s0_s1_s2 = generate_s0_s1_s2(&c0_c1[1..]).unwrap();
        let s1 = &s0_s1_s2[1..1 + RTMP_SIG_SIZE];

        let c2 = generate_c2(s1).unwrap();

        assert_eq!(c2, s1);
    }

    #[test]
    fn test_signature_size_is_checked() {
        assert!(generate_s0_s1_s2(&[0; 100]).is_err());
        assert!(generate_c2(&[0; 100]).is_err());
    }

    #[test]
    fn test_version_check() {
        assert!(rtmp_check_version(0x03));
        assert!(!rtmp_check_version(0x02));
        assert!(!rtmp_check_version(0x06));
    }
}
