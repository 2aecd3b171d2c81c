//! Event Loop
//!
//! Waits on the next feed line and the earliest hysteresis deadline, and
//! processes whichever comes first to completion before waiting again.

use crate::feed::parse_line;
use crate::host::FallbackHost;
use crate::HostError;
use fallback::Clock;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Split};
use tracing::{info, warn};

/// Run `host` until `input` reaches end of file. Publications are written
/// to `output` as JSON lines. The host is shut down on every exit path.
pub async fn run<C, R, W>(host: &mut FallbackHost<C>, input: R, mut output: W) -> Result<(), HostError>
where
    C: Clock + Clone,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.split(b'\n');

    host.start();
    let result = serve(host, &mut lines, &mut output).await;

    host.shutdown();
    let flushed = output.flush().await;
    result?;
    flushed?;
    Ok(())
}

async fn serve<C, R, W>(
    host: &mut FallbackHost<C>,
    lines: &mut Split<R>,
    output: &mut W,
) -> Result<(), HostError>
where
    C: Clock + Clone,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    flush_publications(host, output).await?;

    loop {
        let wait = host.next_deadline().map(|deadline| {
            (deadline - host.clock().now())
                .to_std()
                .unwrap_or(Duration::ZERO)
        });
        let timer = async {
            match wait {
                Some(wait) => tokio::time::sleep(wait).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            segment = lines.next_segment() => {
                let Some(segment) = segment? else {
                    info!("State feed closed");
                    return Ok(());
                };
                apply_line(host, segment);
            }
            _ = timer => {
                host.fire_due_timers();
            }
        }

        flush_publications(host, output).await?;
    }
}

fn apply_line<C: Clock + Clone>(host: &mut FallbackHost<C>, mut segment: Vec<u8>) {
    if segment.last() == Some(&b'\r') {
        segment.pop();
    }
    let line = match String::from_utf8(segment) {
        Ok(line) => line,
        Err(err) => {
            warn!("Skipping feed line that is not UTF-8: {}", err);
            return;
        }
    };
    match parse_line(&line) {
        Ok(Some(update)) => host.apply(update),
        Ok(None) => {}
        Err(err) => warn!("Skipping feed line: {}", err),
    }
}

async fn flush_publications<C, W>(host: &mut FallbackHost<C>, output: &mut W) -> Result<(), HostError>
where
    C: Clock + Clone,
    W: AsyncWrite + Unpin,
{
    for publication in host.drain_publications() {
        let mut line = serde_json::to_vec(&publication)?;
        line.push(b'\n');
        output.write_all(&line).await?;
    }
    output.flush().await?;
    Ok(())
}
