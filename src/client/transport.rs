use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncWrite, AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

use std::future::Future;
use std::io;


/// The byte stream a handshake runs over, plus the token that may tear it
/// down. One read or write is outstanding at a time.
pub(crate) struct Transport<'a, S> {
    stream: &'a mut S,
    cancel: Option<CancellationToken>,
}

impl<'a, S: AsyncRead + AsyncWrite + Unpin> Transport<'a, S> {
    pub fn new(stream: &'a mut S, cancel: Option<CancellationToken>) -> Self {
        Self { stream, cancel }
    }

    pub fn cancel_on(&mut self, token: CancellationToken) {
        self.cancel = Some(token);
    }

    /// Writes all of `data` and flushes.
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        let Transport { stream, cancel } = self;
        let ret = guarded(cancel.as_ref(), async {
            stream.write_all(data).await?;
            stream.flush().await
        }).await;
        trace!("socks write {} bytes: {:?}", data.len(), ret.as_ref().map(|_| ()));
        ret
    }

    /// Appends exactly `n` bytes read from the stream to `buf`.
    ///
    /// On failure the bytes that did arrive are dropped again.
    pub async fn read_exact(&mut self, buf: &mut BytesMut, n: usize) -> Result<()> {
        let start = buf.len();
        buf.resize(start + n, 0);

        let Transport { stream, cancel } = self;
        let ret = guarded(cancel.as_ref(), stream.read_exact(&mut buf[start..])).await;
        trace!("socks read {} bytes: {:?}", n, ret.as_ref().map(|_| ()));

        match ret {
            Ok(_) => Ok(()),
            Err(e) => {
                buf.truncate(start);
                Err(e)
            }
        }
    }
}

async fn guarded<T, F>(cancel: Option<&CancellationToken>, io: F) -> Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    match cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(Error::Aborted),
            ret = io => ret.map_err(Error::from),
        },
        None => io.await.map_err(Error::from),
    }
}
