#[macro_use]
extern crate log;
extern crate env_logger;
extern crate tokio;
extern crate socks_client;


mod boot;

use socks_client::config::ClientConfig;
use socks_client::Address;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use std::io;


fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match boot::boot_client()? {
        Some(config) => config,
        None => return Ok(()),
    };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(config))?;

    Ok(())
}

async fn run(config: ClientConfig) -> io::Result<()> {
    let mut stream = TcpStream::connect(&config.proxy_addr).await?;
    let _ = stream.set_nodelay(true);
    info!("connected to socks proxy {:?}", stream.peer_addr()?);

    let cancel = CancellationToken::new();
    let timer = config.timeout.map(|timeout| {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            warn!("socks handshake timed out after {:?}", timeout);
            cancel.cancel();
        })
    });

    let request = config.handshake_request();
    let mut bound = None;
    let ret = request
        .handshake_with(&mut stream, Some(cancel), |addr: &Address| bound = Some(addr.clone()))
        .await;

    if let Some(timer) = timer {
        timer.abort();
    }
    if let Err(e) = ret {
        error!("socks handshake with {} failed: {}", config.proxy_addr, e);
        return Err(e.into());
    }
    if let Some(bound) = bound {
        info!("relaying {}:{} through proxy endpoint {}", config.target_host, config.target_port, bound);
    }

    // 隧道就绪，中继 stdin/stdout。
    relay(stream, tokio::io::stdin(), tokio::io::stdout()).await?;

    Ok(())
}

/// Copies `input` to the tunnel and the tunnel to `output` until both
/// directions hit EOF. `input` ending half-closes the tunnel so the proxy
/// still delivers its response.
async fn relay<S, I, O>(stream: S, mut input: I, mut output: O) -> io::Result<(u64, u64)>
where
    S: AsyncRead + AsyncWrite,
    I: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let (mut r, mut w) = tokio::io::split(stream);

    let upstream = async {
        let n = tokio::io::copy(&mut input, &mut w).await?;
        w.shutdown().await?;
        debug!("stdin closed after {} bytes", n);
        Ok::<_, io::Error>(n)
    };
    let downstream = async {
        let n = tokio::io::copy(&mut r, &mut output).await?;
        output.flush().await?;
        debug!("proxy closed after {} bytes", n);
        Ok::<_, io::Error>(n)
    };

    tokio::try_join!(upstream, downstream)
}
