//! Remote configuration client: one request, one answer, bounded by a deadline.

use hermes_core::message::{
    CheckAliveData, CurrentConfigurationData, Fields, GetConfigurationData, NotificationData,
    SetConfigurationData,
};
use hermes_core::{Dispatcher, Error, Message, envelope};
use std::ops::ControlFlow;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Asks the machine at `host:port` for its current configuration.
pub async fn get_configuration(
    host: &str,
    port: u16,
    timeout: Duration,
) -> Result<CurrentConfigurationData, Error> {
    request(host, port, GetConfigurationData {}.into(), timeout).await
}

/// Replaces the configuration of the machine at `host:port`. Returns the
/// configuration the machine reports back; a refusal is a peer error.
pub async fn set_configuration(
    host: &str,
    port: u16,
    configuration: SetConfigurationData,
    timeout: Duration,
) -> Result<CurrentConfigurationData, Error> {
    request(host, port, configuration.into(), timeout).await
}

async fn request(
    host: &str,
    port: u16,
    message: Message,
    timeout: Duration,
) -> Result<CurrentConfigurationData, Error> {
    let tag = message.tag();
    tokio::time::timeout(timeout, exchange(host, port, message))
        .await
        .map_err(|_| Error::timeout(format!("{tag} to {host}:{port} not answered within {timeout:?}")))?
}

async fn exchange(host: &str, port: u16, message: Message) -> Result<CurrentConfigurationData, Error> {
    let mut stream = TcpStream::connect((host, port))
        .await
        .map_err(|e| Error::network(format!("connect to {host}:{port} failed: {e}")))?;
    tracing::debug!(host, port, tag = message.tag(), "configuration request");
    stream.write_all(envelope::encode(&message).as_bytes()).await?;

    let mut dispatcher = Dispatcher::new(&[
        CurrentConfigurationData::TAG,
        NotificationData::TAG,
        CheckAliveData::TAG,
    ]);
    let mut buf = vec![0u8; 4096];
    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Err(Error::network(format!(
                "{host}:{port} closed the connection without answering"
            )));
        }
        let mut answer = None;
        dispatcher.dispatch(&buf[..n], |message| match message {
            Message::CurrentConfiguration(current) => {
                answer = Some(Ok(current));
                ControlFlow::Break(())
            }
            Message::Notification(notification) => {
                answer = Some(Err(Error::peer(format!(
                    "configuration refused ({:?}): {}",
                    notification.notification_code, notification.description
                ))));
                ControlFlow::Break(())
            }
            _ => ControlFlow::Continue(()),
        })?;
        if let Some(answer) = answer {
            let _ = stream.shutdown().await;
            return answer;
        }
    }
}
