//! NTLM authentication for TDS integrated security.
//!
//! TDS advertises integrated security in Login7; the server responds with
//! an SSPI challenge token. The client computes an NTLMv1 response: the NT
//! response is `HMAC-MD5(MD4(UTF-16LE(password)), server_challenge ||
//! client_challenge)`, and the authenticate message carries the domain,
//! username, workstation, and both LM/NT responses.

use hmac::{Hmac, Mac};
use md4::{Digest, Md4};

use crate::error::AuthError;

type HmacMd5 = Hmac<md5::Md5>;

/// NTLM negotiate flags asserted in the negotiate message: unicode,
/// OEM, request target, NTLM, always sign, NTLM2 key, 128-bit, 56-bit.
pub const NEGOTIATE_FLAGS: u32 = 0x0000_8207 | 0x0008_0000 | 0x2000_0000 | 0x8000_0000;

const NTLM_SIGNATURE: &[u8; 8] = b"NTLMSSP\0";

/// The NT key derived from a password: `MD4(UTF-16LE(password))`.
#[must_use]
pub fn nt_key(password: &str) -> [u8; 16] {
    let utf16le: Vec<u8> = password
        .encode_utf16()
        .flat_map(u16::to_le_bytes)
        .collect();
    let mut hasher = Md4::new();
    hasher.update(&utf16le);
    hasher.finalize().into()
}

/// Compute the NTLMv1 NT response given the 8-byte server challenge and an
/// 8-byte client challenge.
///
/// Per the NTLMv1 extended session security variant: `HMAC-MD5(nt_key,
/// server_challenge || client_challenge)`, truncated/padded to 24 bytes by
/// appending the client challenge (the server recomputes the same HMAC and
/// compares the leading 16 bytes).
#[must_use]
pub fn nt_response(password: &str, server_challenge: &[u8; 8], client_challenge: &[u8; 8]) -> Vec<u8> {
    let key = nt_key(password);
    let mut mac = HmacMd5::new_from_slice(&key).expect("HMAC accepts any key length");
    mac.update(server_challenge);
    mac.update(client_challenge);
    let digest = mac.finalize().into_bytes();

    let mut response = Vec::with_capacity(24);
    response.extend_from_slice(&digest);
    response.extend_from_slice(client_challenge);
    response
}

/// Build the NTLM Type 1 (negotiate) message.
#[must_use]
pub fn negotiate_message() -> Vec<u8> {
    let mut msg = Vec::with_capacity(32);
    msg.extend_from_slice(NTLM_SIGNATURE);
    msg.extend_from_slice(&1u32.to_le_bytes()); // message type
    msg.extend_from_slice(&NEGOTIATE_FLAGS.to_le_bytes());
    msg.extend_from_slice(&[0u8; 16]); // empty domain/workstation security buffers
    msg
}

/// The server challenge extracted from a Type 2 (challenge) message.
///
/// # Errors
///
/// Returns [`AuthError::AuthenticationFailed`] if the message is too short
/// or its signature doesn't match NTLMSSP.
pub fn parse_challenge_message(msg: &[u8]) -> Result<[u8; 8], AuthError> {
    if msg.len() < 32 || &msg[0..8] != NTLM_SIGNATURE {
        return Err(AuthError::AuthenticationFailed(
            "malformed NTLM challenge message".into(),
        ));
    }
    let mut challenge = [0u8; 8];
    challenge.copy_from_slice(&msg[24..32]);
    Ok(challenge)
}

/// Build the NTLM Type 3 (authenticate) message.
#[must_use]
pub fn authenticate_message(
    domain: &str,
    username: &str,
    workstation: &str,
    password: &str,
    server_challenge: &[u8; 8],
    client_challenge: &[u8; 8],
) -> Vec<u8> {
    let nt_resp = nt_response(password, server_challenge, client_challenge);
    // LM response: NTLMv1 with extended session security sends the client
    // challenge padded to 24 bytes instead of a real LM hash.
    let mut lm_resp = vec![0u8; 24];
    lm_resp[..8].copy_from_slice(client_challenge);

    let domain_utf16: Vec<u8> = domain.encode_utf16().flat_map(u16::to_le_bytes).collect();
    let user_utf16: Vec<u8> = username.encode_utf16().flat_map(u16::to_le_bytes).collect();
    let workstation_utf16: Vec<u8> = workstation
        .encode_utf16()
        .flat_map(u16::to_le_bytes)
        .collect();

    const HEADER_LEN: usize = 8 + 4 + 8 * 6 + 4; // signature + type + 6 security buffers + flags
    let mut offset = HEADER_LEN as u32;

    let mut msg = Vec::with_capacity(HEADER_LEN);
    msg.extend_from_slice(NTLM_SIGNATURE);
    msg.extend_from_slice(&3u32.to_le_bytes());

    let mut security_buffer = |len: usize, off: &mut u32| {
        let len = len as u16;
        let mut buf = Vec::with_capacity(8);
        buf.extend_from_slice(&len.to_le_bytes());
        buf.extend_from_slice(&len.to_le_bytes());
        buf.extend_from_slice(&off.to_le_bytes());
        *off += u32::from(len);
        buf
    };

    msg.extend_from_slice(&security_buffer(lm_resp.len(), &mut offset));
    msg.extend_from_slice(&security_buffer(nt_resp.len(), &mut offset));
    msg.extend_from_slice(&security_buffer(domain_utf16.len(), &mut offset));
    msg.extend_from_slice(&security_buffer(user_utf16.len(), &mut offset));
    msg.extend_from_slice(&security_buffer(workstation_utf16.len(), &mut offset));
    msg.extend_from_slice(&security_buffer(0, &mut offset)); // session key, unused
    msg.extend_from_slice(&NEGOTIATE_FLAGS.to_le_bytes());

    msg.extend_from_slice(&domain_utf16);
    msg.extend_from_slice(&user_utf16);
    msg.extend_from_slice(&workstation_utf16);
    msg.extend_from_slice(&lm_resp);
    msg.extend_from_slice(&nt_resp);

    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nt_response_is_deterministic() {
        let server = [1u8; 8];
        let client = [2u8; 8];
        let a = nt_response("password", &server, &client);
        let b = nt_response("password", &server, &client);
        assert_eq!(a, b);
        assert_eq!(a.len(), 24);
        assert_eq!(&a[16..], &client);
    }

    #[test]
    fn different_passwords_diverge() {
        let server = [1u8; 8];
        let client = [2u8; 8];
        let a = nt_response("password1", &server, &client);
        let b = nt_response("password2", &server, &client);
        assert_ne!(a[..16], b[..16]);
    }

    #[test]
    fn negotiate_message_has_signature() {
        let msg = negotiate_message();
        assert_eq!(&msg[0..8], NTLM_SIGNATURE);
    }

    #[test]
    fn challenge_parsing_rejects_short_messages() {
        assert!(parse_challenge_message(&[0u8; 10]).is_err());
    }

    #[test]
    fn authenticate_message_contains_names() {
        let server = [7u8; 8];
        let client = [9u8; 8];
        let msg = authenticate_message("CORP", "bob", "WS01", "pw", &server, &client);
        assert_eq!(&msg[0..8], NTLM_SIGNATURE);
        assert!(msg.len() > 64);
    }
}
