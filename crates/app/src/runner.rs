//! Runs the app until it terminates or the process is asked to stop.

use crate::{error::AppError, App};
use std::{future::Future, pin::pin};
use tracing::{error, info, trace};

/// Runs `app` until it terminates, `ctrl-c` is received or, on unix, `SIGTERM` is received.
///
/// A signal triggers a graceful termination. Returns the error the app terminated with, if any.
pub async fn run_until_ctrl_c(app: App) -> Result<(), AppError> {
    run_until_exit(app, exit_signal()).await
}

/// Runs `app` until it terminates or `exit` resolves.
///
/// If `exit` fails the app is terminated before the error is returned.
async fn run_until_exit<F>(app: App, exit: F) -> Result<(), AppError>
where
    F: Future<Output = std::io::Result<()>>,
{
    let terminator = app.terminator().clone();
    let mut exit = pin!(exit);

    let mut exit_res = {
        let run = pin!(app.run());
        tokio::select! {
            res = run => {
                if let Err(err) = res {
                    terminator.terminated().await;
                    return Err(err)
                }
                None
            }
            res = exit.as_mut() => {
                info!(target: "firehose::app", "Received exit signal during startup");
                Some(res)
            }
        }
    };

    if exit_res.is_none() && !terminator.is_terminating() {
        tokio::select! {
            res = exit.as_mut() => {
                info!(target: "firehose::app", "Received exit signal");
                exit_res = Some(res);
            }
            _ = terminator.terminated() => {}
        }
    }

    match exit_res {
        Some(Err(err)) => {
            error!(target: "firehose::app", %err, "Failed to listen for exit signals");
            terminator.terminate(Some(format!("failed to listen for exit signals: {err}")));
            terminator.terminated().await;
            return Err(err.into())
        }
        Some(Ok(())) => terminator.terminate(None),
        None => {}
    }

    terminator.terminated().await;
    match terminator.error() {
        Some(err) => Err(AppError::Terminated(err)),
        None => Ok(()),
    }
}

/// Resolves on `ctrl-c` or `SIGTERM`.
async fn exit_signal() -> std::io::Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut stream = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        let sigterm = pin!(stream.recv());
        let ctrl_c = pin!(ctrl_c);

        tokio::select! {
            res = ctrl_c => {
                res?;
                trace!(target: "firehose::app", "Received ctrl-c");
            },
            _ = sigterm => {
                trace!(target: "firehose::app", "Received SIGTERM");
            },
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await?;
        trace!(target: "firehose::app", "Received ctrl-c");
    }

    Ok(())
}
