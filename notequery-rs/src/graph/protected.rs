//! Access to protected note content.

/// Decryption of protected notes, available only while a session is open.
pub trait ProtectedSession {
    fn is_available(&self) -> bool;

    /// Decrypt stored content. `None` when decryption fails.
    fn decrypt(&self, ciphertext: &str) -> Option<String>;
}

/// No protected session: protected content is never readable.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProtectedSession;

impl ProtectedSession for NoProtectedSession {
    fn is_available(&self) -> bool {
        false
    }

    fn decrypt(&self, _ciphertext: &str) -> Option<String> {
        None
    }
}

/// Read protected content through `session`, if possible.
pub fn readable_content(session: &dyn ProtectedSession, content: &str, is_protected: bool) -> Option<String> {
    if !is_protected {
        return Some(content.to_string());
    }
    if !session.is_available() {
        return None;
    }
    session.decrypt(content)
}
