//! Streaming zip tee: bytes flow to the client while a copy accumulates
//! in memory; only a stream that reaches clean end-of-file is committed to
//! the store, so a broken upstream never leaves a partial cache entry.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

use modproxy_core::ZipReader;

use crate::plugin::SharedRegistry;
use crate::store::FileStore;

pub(crate) struct CachingReader {
    src: ZipReader,
    buf: Vec<u8>,
    key: String,
    store: Arc<dyn FileStore>,
    registry: Option<SharedRegistry>,
    module_path: String,
    version: String,
    do_not_cache: bool,
    committed: bool,
}

impl CachingReader {
    pub(crate) fn new(
        src: ZipReader,
        key: String,
        store: Arc<dyn FileStore>,
        registry: Option<SharedRegistry>,
        module_path: String,
        version: String,
    ) -> Self {
        Self {
            src,
            buf: Vec::new(),
            key,
            store,
            registry,
            module_path,
            version,
            do_not_cache: false,
            committed: false,
        }
    }

    fn commit(&mut self) {
        if self.do_not_cache || self.committed {
            return;
        }
        self.committed = true;

        if let Err(err) = self.store.set(&self.key, &self.buf) {
            tracing::warn!(key = %self.key, error = %err, "failed to save source archive into cache");
            return;
        }
        if let Some(registry) = &self.registry {
            let mut reg = registry
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            reg.entry(self.module_path.clone())
                .or_default()
                .insert(self.version.clone());
        }
    }
}

impl AsyncRead for CachingReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        match Pin::new(&mut this.src).poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                let filled = buf.filled().len();
                if filled > before {
                    if !this.do_not_cache {
                        this.buf.extend_from_slice(&buf.filled()[before..]);
                    }
                } else if buf.remaining() > 0 {
                    // clean end of stream
                    this.commit();
                }
                Poll::Ready(Ok(()))
            }
            Poll::Ready(Err(err)) => {
                this.do_not_cache = true;
                Poll::Ready(Err(err))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
