//! Query cancellation support.
//!
//! TDS has a real out-of-band cancellation wire message (an Attention
//! packet); PostgreSQL and MySQL don't expose one through this crate's
//! query path, so cancelling either of those engines follows the
//! documented minimum: mark the connection poisoned so the in-flight
//! request's next read fails and the connection is dropped rather than
//! returned to a pool. A full `CancelRequest`/`COM_PROCESS_KILL` path
//! (opening a second connection to interrupt the first) is a real
//! follow-up, not implemented here.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::net::TcpStream;

use crate::error::{Error, Result};

type TdsPlainCancelHandle = tds_codec::CancelHandle<TcpStream>;
#[cfg(feature = "tls")]
type TdsTlsCancelHandle =
    tds_codec::CancelHandle<sql_tls::TlsStream<sql_tls::TlsPreloginWrapper<TcpStream>>>;

/// Handle for cancelling the current request on a connection.
///
/// Cloneable and `Send + Sync`, so it can be handed to another task while
/// the owning task blocks reading a response.
#[derive(Clone)]
pub struct CancelHandle {
    inner: Inner,
}

#[derive(Clone)]
enum Inner {
    TdsPlain(TdsPlainCancelHandle),
    #[cfg(feature = "tls")]
    TdsTls(TdsTlsCancelHandle),
    PoisonOnly(Arc<AtomicBool>),
}

impl CancelHandle {
    pub(crate) fn from_tds_plain(handle: TdsPlainCancelHandle) -> Self {
        Self {
            inner: Inner::TdsPlain(handle),
        }
    }

    #[cfg(feature = "tls")]
    pub(crate) fn from_tds_tls(handle: TdsTlsCancelHandle) -> Self {
        Self {
            inner: Inner::TdsTls(handle),
        }
    }

    /// A handle for an engine with no wire-level cancellation. `cancel()`
    /// flips the shared poison flag; the connection checks it before its
    /// next request and refuses to proceed with [`Error::ConnectionClosed`].
    pub(crate) fn poison_only(flag: Arc<AtomicBool>) -> Self {
        Self {
            inner: Inner::PoisonOnly(flag),
        }
    }

    /// Signal cancellation of the request currently in flight.
    ///
    /// Idempotent — calling this more than once has no additional effect.
    pub async fn cancel(&self) -> Result<()> {
        match &self.inner {
            Inner::TdsPlain(h) => h
                .cancel()
                .await
                .map_err(|e| Error::ConnectionError(e.to_string())),
            #[cfg(feature = "tls")]
            Inner::TdsTls(h) => h
                .cancel()
                .await
                .map_err(|e| Error::ConnectionError(e.to_string())),
            Inner::PoisonOnly(flag) => {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            }
        }
    }

    /// Wait for the server to acknowledge cancellation. On engines without
    /// wire-level cancellation this returns immediately.
    pub async fn wait_cancelled(&self) {
        match &self.inner {
            Inner::TdsPlain(h) => h.wait_cancelled().await,
            #[cfg(feature = "tls")]
            Inner::TdsTls(h) => h.wait_cancelled().await,
            Inner::PoisonOnly(_) => {}
        }
    }

    /// True if a cancellation has been requested but not yet observed by
    /// the connection.
    #[must_use]
    pub fn is_cancelling(&self) -> bool {
        match &self.inner {
            Inner::TdsPlain(h) => h.is_cancelling(),
            #[cfg(feature = "tls")]
            Inner::TdsTls(h) => h.is_cancelling(),
            Inner::PoisonOnly(flag) => flag.load(Ordering::SeqCst),
        }
    }
}

impl std::fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelHandle")
            .field("is_cancelling", &self.is_cancelling())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CancelHandle>();
    }

    #[tokio::test]
    async fn poison_only_flips_flag_on_cancel() {
        let flag = Arc::new(AtomicBool::new(false));
        let handle = CancelHandle::poison_only(flag.clone());
        assert!(!handle.is_cancelling());
        handle.cancel().await.unwrap();
        assert!(handle.is_cancelling());
        assert!(flag.load(Ordering::SeqCst));
    }
}
