use std::sync::Arc;

use zeroize::Zeroizing;

/// Secret bytes that are not `Debug`/`Display` printable and are zeroized on drop.
#[derive(Clone)]
pub struct SecretValue(Arc<Zeroizing<Vec<u8>>>);

impl SecretValue {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(Arc::new(Zeroizing::new(bytes)))
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self::from_bytes(s.into().into_bytes())
    }

    pub fn expose_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }

    pub fn expose_str(&self) -> Option<&str> {
        std::str::from_utf8(self.0.as_slice()).ok()
    }
}

impl std::fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretValue(<redacted>)")
    }
}
