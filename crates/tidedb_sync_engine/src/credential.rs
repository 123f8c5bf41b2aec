//! Runtime-replaceable bearer credential.

use parking_lot::RwLock;
use zeroize::Zeroizing;

/// A bearer token attached to outgoing sync requests.
///
/// The token bytes are zeroized exactly once, when the token is
/// dropped (either by replacement or at shutdown).
pub struct BearerToken(Zeroizing<String>);

impl BearerToken {
    /// Wraps a raw token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(Zeroizing::new(token.into()))
    }

    /// Reads a token from `TIDEDB_SYNC_TOKEN`, if set.
    pub fn from_env() -> Option<Self> {
        std::env::var("TIDEDB_SYNC_TOKEN").ok().map(Self::new)
    }

    /// Renders the `Authorization` header value.
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.0.as_str())
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the token itself.
        f.write_str("BearerToken(..)")
    }
}

/// Holds the credential currently attached to outgoing requests.
///
/// Replaceable at runtime without restarting the engine; replacing it
/// invalidates the previously attached credential exactly once (the
/// displaced token is zeroized on drop).
#[derive(Default)]
pub struct CredentialCell {
    token: RwLock<Option<BearerToken>>,
}

impl CredentialCell {
    /// Creates an empty cell (requests go out unauthenticated).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cell holding the given token.
    pub fn with_token(token: BearerToken) -> Self {
        Self {
            token: RwLock::new(Some(token)),
        }
    }

    /// Replaces the credential. Passing None detaches it. The
    /// previous token, if any, is dropped (and zeroized) here.
    pub fn replace(&self, token: Option<BearerToken>) {
        *self.token.write() = token;
    }

    /// Returns the `Authorization` header for the current credential,
    /// if one is attached.
    pub fn authorization_header(&self) -> Option<(String, String)> {
        self.token
            .read()
            .as_ref()
            .map(|t| ("Authorization".to_string(), t.header_value()))
    }

    /// Returns true if a credential is currently attached.
    pub fn is_attached(&self) -> bool {
        self.token.read().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_rendering() {
        let cell = CredentialCell::with_token(BearerToken::new("tok-123"));
        let (name, value) = cell.authorization_header().unwrap();
        assert_eq!(name, "Authorization");
        assert_eq!(value, "Bearer tok-123");
    }

    #[test]
    fn replace_swaps_credential() {
        let cell = CredentialCell::new();
        assert!(!cell.is_attached());
        assert!(cell.authorization_header().is_none());

        cell.replace(Some(BearerToken::new("first")));
        assert_eq!(cell.authorization_header().unwrap().1, "Bearer first");

        cell.replace(Some(BearerToken::new("second")));
        assert_eq!(cell.authorization_header().unwrap().1, "Bearer second");

        cell.replace(None);
        assert!(!cell.is_attached());
    }

    #[test]
    fn debug_does_not_leak_token() {
        let token = BearerToken::new("secret-value");
        assert!(!format!("{token:?}").contains("secret-value"));
    }
}
