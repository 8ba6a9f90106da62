use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;
use tracing::{error, info, warn};
use wp_api_types::Account;

/// EIP-1193 error code for a request the user rejected.
pub const USER_REJECTED: i64 = 4001;
/// EIP-1193 error code for a method the provider does not support.
pub const UNSUPPORTED_METHOD: i64 = 4200;
/// JSON-RPC internal error.
pub const INTERNAL_ERROR: i64 = -32603;

/// Error object returned by an EIP-1193 `request` call.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[error("provider error {code}: {message}")]
pub struct ProviderError {
    pub code: i64,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR, message)
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == USER_REJECTED
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectError {
    #[error("no wallet provider detected")]
    NoProviderDetected,
    #[error("user declined the connection request")]
    UserDeclined,
    #[error("provider returned no accounts")]
    NoAccounts,
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// The `request({ method, params })` surface of an injected wallet.
///
/// Browser providers hand back JS promises, so implementations are not
/// required to be `Send`.
#[async_trait(?Send)]
pub trait Eip1193Provider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;
}

/// Wraps the (possibly absent) injected provider and exposes account
/// discovery. Cheap to clone.
#[derive(Clone, Default)]
pub struct SigningProviderAdapter {
    provider: Option<Rc<dyn Eip1193Provider>>,
}

impl SigningProviderAdapter {
    pub fn new(provider: Option<Rc<dyn Eip1193Provider>>) -> Self {
        Self { provider }
    }

    pub fn with_provider(provider: Rc<dyn Eip1193Provider>) -> Self {
        Self::new(Some(provider))
    }

    pub fn absent() -> Self {
        Self::new(None)
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    pub fn provider(&self) -> Option<Rc<dyn Eip1193Provider>> {
        self.provider.clone()
    }

    /// Queries already-authorized accounts without prompting. Every failure
    /// is logged and reported as `None`.
    pub async fn detect_silent_account(&self) -> Option<Account> {
        let Some(provider) = &self.provider else {
            error!("no wallet provider injected; install a wallet extension");
            return None;
        };

        let accounts = match provider.request("eth_accounts", json!([])).await {
            Ok(value) => parse_accounts(value),
            Err(err) => Err(err),
        };

        match accounts {
            Ok(accounts) => match accounts.into_iter().next() {
                Some(account) => {
                    info!(account = %account, "found an authorized account");
                    Some(Account(account))
                }
                None => {
                    warn!("no authorized account found");
                    None
                }
            },
            Err(err) => {
                error!("eth_accounts failed: {}", err);
                None
            }
        }
    }

    /// Prompts the user for authorization through the provider's own UI.
    pub async fn request_account(&self) -> Result<Account, ConnectError> {
        let Some(provider) = &self.provider else {
            return Err(ConnectError::NoProviderDetected);
        };

        let value = provider
            .request("eth_requestAccounts", json!([]))
            .await
            .map_err(|err| {
                if err.is_user_rejection() {
                    ConnectError::UserDeclined
                } else {
                    ConnectError::Provider(err)
                }
            })?;

        let account = parse_accounts(value)?
            .into_iter()
            .next()
            .ok_or(ConnectError::NoAccounts)?;

        info!(account = %account, "connected");
        Ok(Account(account))
    }
}

pub fn parse_accounts(value: Value) -> Result<Vec<String>, ProviderError> {
    serde_json::from_value::<Vec<String>>(value)
        .map_err(|err| ProviderError::internal(format!("malformed account list: {err}")))
}

/// In-memory provider for hosts without an injected wallet and for tests.
///
/// `eth_accounts` reports the currently authorized accounts;
/// `eth_requestAccounts` authorizes `grantable` if set, otherwise rejects
/// with [`USER_REJECTED`].
#[derive(Debug, Default)]
pub struct StaticProvider {
    authorized: RefCell<Vec<String>>,
    grantable: Option<Vec<String>>,
}

impl StaticProvider {
    pub fn new(authorized: Vec<String>, grantable: Option<Vec<String>>) -> Self {
        Self {
            authorized: RefCell::new(authorized),
            grantable,
        }
    }

    pub fn authorized(accounts: &[&str]) -> Self {
        let accounts: Vec<String> = accounts.iter().map(|a| (*a).to_owned()).collect();
        Self::new(accounts.clone(), Some(accounts))
    }

    pub fn granting(accounts: &[&str]) -> Self {
        Self::new(Vec::new(), Some(accounts.iter().map(|a| (*a).to_owned()).collect()))
    }

    pub fn refusing() -> Self {
        Self::new(Vec::new(), None)
    }
}

#[async_trait(?Send)]
impl Eip1193Provider for StaticProvider {
    async fn request(&self, method: &str, _params: Value) -> Result<Value, ProviderError> {
        match method {
            "eth_accounts" => Ok(json!(self.authorized.borrow().clone())),
            "eth_requestAccounts" => match &self.grantable {
                Some(accounts) => {
                    *self.authorized.borrow_mut() = accounts.clone();
                    Ok(json!(accounts))
                }
                None => Err(ProviderError::new(USER_REJECTED, "User rejected the request.")),
            },
            other => Err(ProviderError::new(
                UNSUPPORTED_METHOD,
                format!("method not supported: {other}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingProvider(ProviderError);

    #[async_trait(?Send)]
    impl Eip1193Provider for FailingProvider {
        async fn request(&self, _method: &str, _params: Value) -> Result<Value, ProviderError> {
            Err(self.0.clone())
        }
    }

    #[tokio::test]
    async fn silent_detection_without_provider_is_none() {
        let adapter = SigningProviderAdapter::absent();
        assert!(!adapter.is_available());
        assert_eq!(adapter.detect_silent_account().await, None);
    }

    #[tokio::test]
    async fn silent_detection_returns_first_authorized_account() {
        let adapter = SigningProviderAdapter::with_provider(Rc::new(StaticProvider::authorized(&[
            "0xabc", "0xdef",
        ])));
        assert_eq!(adapter.detect_silent_account().await, Some(Account("0xabc".to_owned())));
    }

    #[tokio::test]
    async fn silent_detection_swallows_provider_failures() {
        let adapter = SigningProviderAdapter::with_provider(Rc::new(FailingProvider(
            ProviderError::internal("boom"),
        )));
        assert_eq!(adapter.detect_silent_account().await, None);

        let adapter = SigningProviderAdapter::with_provider(Rc::new(StaticProvider::granting(&["0xabc"])));
        assert_eq!(adapter.detect_silent_account().await, None);
    }

    #[tokio::test]
    async fn request_account_classifies_failures() {
        let absent = SigningProviderAdapter::absent();
        assert_eq!(absent.request_account().await, Err(ConnectError::NoProviderDetected));

        let refusing = SigningProviderAdapter::with_provider(Rc::new(StaticProvider::refusing()));
        assert_eq!(refusing.request_account().await, Err(ConnectError::UserDeclined));

        let broken = SigningProviderAdapter::with_provider(Rc::new(FailingProvider(
            ProviderError::internal("disconnected"),
        )));
        assert!(matches!(broken.request_account().await, Err(ConnectError::Provider(_))));

        let empty = SigningProviderAdapter::with_provider(Rc::new(StaticProvider::new(Vec::new(), Some(Vec::new()))));
        assert_eq!(empty.request_account().await, Err(ConnectError::NoAccounts));
    }

    #[tokio::test]
    async fn granted_request_authorizes_silent_detection() {
        let provider = Rc::new(StaticProvider::granting(&["0xabc"]));
        let adapter = SigningProviderAdapter::with_provider(provider);

        assert_eq!(adapter.request_account().await, Ok(Account("0xabc".to_owned())));
        assert_eq!(adapter.detect_silent_account().await, Some(Account("0xabc".to_owned())));
    }
}
