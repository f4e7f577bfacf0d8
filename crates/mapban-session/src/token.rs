//! Token issuing.
//!
//! A token is the only credential in mapban: whoever presents it acts as
//! the role it was issued for. The [`TokenIssuer`] trait is the seam that
//! lets tests swap the OS random source for a predictable sequence.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use mapban_protocol::Token;
use rand::TryRngCore;
use rand::rngs::OsRng;

use crate::SessionError;

/// Random bytes per token. 144 bits, and a multiple of 3 so the base64
/// form has no padding to strip: 24 characters.
pub const TOKEN_BYTES: usize = 18;

/// Produces unforgeable session tokens.
pub trait TokenIssuer: Send + Sync + 'static {
    /// Generates one token.
    ///
    /// # Errors
    /// [`SessionError::TokenGeneration`] if no secure randomness is
    /// available. Callers must fail the request, not retry weaker.
    fn issue(&self) -> Result<Token, SessionError>;
}

/// Issues tokens from the operating system's CSPRNG, base64url-encoded
/// without padding.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTokenIssuer;

impl TokenIssuer for RandomTokenIssuer {
    fn issue(&self) -> Result<Token, SessionError> {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| SessionError::TokenGeneration(e.to_string()))?;
        Ok(Token::new(URL_SAFE_NO_PAD.encode(bytes)))
    }
}
