use crate::codec::{read_sentence, write_sentence};
use crate::sentence::{Reply, Sentence};
use rw_core::{ClientError, Device};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tracing::debug;

/// An authenticated RouterOS API session.
pub struct Client<S> {
    stream: S,
    timeout: Duration,
}

impl Client<BufStream<TcpStream>> {
    /// Open a TCP session to the device and log in.
    pub async fn connect(device: &Device, timeout: Duration) -> Result<Self, ClientError> {
        let endpoint = device.endpoint();
        debug!(device = %device.name, endpoint = %endpoint, "connecting to RouterOS API");

        let stream = tokio::time::timeout(timeout, TcpStream::connect(&endpoint))
            .await
            .map_err(|_| ClientError::Timeout(timeout))?
            .map_err(|source| ClientError::Connect {
                address: endpoint.clone(),
                source,
            })?;
        stream.set_nodelay(true)?;

        let mut client = Client::new(BufStream::new(stream), timeout);
        client.login(&device.user, &device.password).await?;
        Ok(client)
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, timeout: Duration) -> Self {
        Self { stream, timeout }
    }

    /// Plain-text login, as accepted by RouterOS 6.43 and later.
    pub async fn login(&mut self, user: &str, password: &str) -> Result<(), ClientError> {
        let args = [format!("=name={}", user), format!("=password={}", password)];
        let timeout = self.timeout;
        let result = tokio::time::timeout(timeout, self.exec("/login", &args))
            .await
            .map_err(|_| ClientError::Timeout(timeout))?;
        match result {
            Ok(_) => Ok(()),
            Err(ClientError::Trap { message, .. }) => Err(ClientError::Auth(message)),
            Err(e) => Err(e),
        }
    }

    /// Run a command and collect its full reply.
    pub async fn run(&mut self, command: &str, args: &[String]) -> Result<Reply, ClientError> {
        let timeout = self.timeout;
        tokio::time::timeout(timeout, self.exec(command, args))
            .await
            .map_err(|_| ClientError::Timeout(timeout))?
    }

    pub async fn close(mut self) -> Result<(), ClientError> {
        self.stream.shutdown().await?;
        Ok(())
    }

    async fn exec(&mut self, command: &str, args: &[String]) -> Result<Reply, ClientError> {
        let mut words = Vec::with_capacity(args.len() + 1);
        words.push(command);
        words.extend(args.iter().map(String::as_str));
        write_sentence(&mut self.stream, &words).await?;

        let mut reply = Reply::default();
        let mut trap = None;
        loop {
            let words = read_sentence(&mut self.stream).await?;
            match Sentence::parse(words)? {
                Sentence::Re(row) => reply.re.push(row),
                Sentence::Empty => {}
                Sentence::Trap(row) => {
                    // keep the first trap, the reply is not over until !done
                    trap.get_or_insert_with(|| row.get("message").to_string());
                }
                Sentence::Fatal(message) => return Err(ClientError::Fatal(message)),
                Sentence::Done(row) => {
                    reply.done = row;
                    break;
                }
            }
        }

        match trap {
            Some(message) => Err(ClientError::Trap {
                command: command.to_string(),
                message,
            }),
            None => Ok(reply),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::write_sentence;
    use tokio::io::{DuplexStream, duplex};

    const TIMEOUT: Duration = Duration::from_secs(2);

    /// Reads one request and answers with the given sentences.
    async fn answer(device: &mut DuplexStream, replies: &[&[&str]]) -> Vec<String> {
        let request = read_sentence(device).await.unwrap();
        for reply in replies {
            write_sentence(device, *reply).await.unwrap();
        }
        request
    }

    #[tokio::test]
    async fn test_login_and_run() {
        let (local, mut device) = duplex(4096);

        let server = tokio::spawn(async move {
            let login = answer(&mut device, &[&["!done"]]).await;
            let print = answer(
                &mut device,
                &[
                    &["!re", "=chain=forward", "=comment=ssh", "=bytes=1024"],
                    &["!re", "=chain=input", "=comment=", "=bytes=7"],
                    &["!done"],
                ],
            )
            .await;
            (login, print)
        });

        let mut client = Client::new(local, TIMEOUT);
        client.login("prometheus", "secret").await.unwrap();
        let reply = client
            .run(
                "/ip/firewall/filter/print",
                &["=.proplist=chain,comment,bytes".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(reply.re.len(), 2);
        assert_eq!(reply.re[0].get("comment"), "ssh");
        assert_eq!(reply.re[1].get("bytes"), "7");

        let (login, print) = server.await.unwrap();
        assert_eq!(login, vec!["/login", "=name=prometheus", "=password=secret"]);
        assert_eq!(
            print,
            vec!["/ip/firewall/filter/print", "=.proplist=chain,comment,bytes"]
        );
    }

    #[tokio::test]
    async fn test_login_trap_is_auth_error() {
        let (local, mut device) = duplex(4096);
        tokio::spawn(async move {
            answer(
                &mut device,
                &[&["!trap", "=message=invalid user name or password (6)"], &["!done"]],
            )
            .await;
        });

        let mut client = Client::new(local, TIMEOUT);
        let err = client.login("prometheus", "wrong").await.unwrap_err();
        assert!(matches!(err, ClientError::Auth(msg) if msg.starts_with("invalid user")));
    }

    #[tokio::test]
    async fn test_trap_fails_command_after_done() {
        let (local, mut device) = duplex(4096);
        tokio::spawn(async move {
            answer(
                &mut device,
                &[&["!trap", "=message=no such command prefix"], &["!done"]],
            )
            .await;
            // the session stays usable after a trap
            answer(&mut device, &[&["!empty"], &["!done"]]).await;
        });

        let mut client = Client::new(local, TIMEOUT);
        let err = client.run("/ip/bogus/print", &[]).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Trap { ref command, .. } if command == "/ip/bogus/print"
        ));

        let reply = client.run("/ip/firewall/filter/print", &[]).await.unwrap();
        assert!(reply.re.is_empty());
    }

    #[tokio::test]
    async fn test_fatal_ends_command() {
        let (local, mut device) = duplex(4096);
        tokio::spawn(async move {
            answer(&mut device, &[&["!fatal", "not logged in"]]).await;
        });

        let mut client = Client::new(local, TIMEOUT);
        let err = client.run("/ip/firewall/filter/print", &[]).await.unwrap_err();
        assert!(matches!(err, ClientError::Fatal(msg) if msg == "not logged in"));
    }

    #[tokio::test]
    async fn test_silent_device_times_out() {
        let (local, _device) = duplex(4096);
        let mut client = Client::new(local, Duration::from_millis(50));
        let err = client.run("/ip/firewall/filter/print", &[]).await.unwrap_err();
        assert!(matches!(err, ClientError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_closed_stream_is_io_error() {
        let (local, device) = duplex(4096);
        drop(device);
        let mut client = Client::new(local, TIMEOUT);
        assert!(client.run("/ip/firewall/filter/print", &[]).await.is_err());
    }
}
