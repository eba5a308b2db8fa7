use std::io;
use std::time::Duration;

use conn_pool::{dial_fn, Connection, Pool, Timeouts};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing_subscriber::EnvFilter;

struct EchoClient {
    stream: Option<TcpStream>,
    broken: bool,
}

impl EchoClient {
    async fn roundtrip(&mut self, payload: &[u8]) -> io::Result<Vec<u8>> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "closed"))?;

        let result = async {
            stream.write_all(payload).await?;
            let mut buf = vec![0; payload.len()];
            stream.read_exact(&mut buf).await?;
            Ok::<_, io::Error>(buf)
        }
        .await;

        if result.is_err() {
            self.broken = true;
        }
        result
    }
}

impl Connection for EchoClient {
    fn close(&mut self) {
        self.stream.take();
    }

    fn is_errored(&self) -> bool {
        self.broken
    }
}

async fn echo_server() -> io::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?.to_string();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0; 1024];
                while let Ok(n) = socket.read(&mut buf).await {
                    if n == 0 || socket.write_all(&buf[..n]).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    Ok(addr)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let addr = echo_server().await?;

    let pool = Pool::builder()
        .max_open(2)
        .idle_timeout(Some(Duration::from_secs(5)))
        .max_lifetime(Some(Duration::from_secs(30)))
        .timeouts(Timeouts::default().with_connect(Some(Duration::from_secs(1))))
        .build(dial_fn(move || {
            let addr = addr.clone();
            async move {
                let stream = TcpStream::connect(addr).await?;
                Ok::<_, io::Error>(EchoClient {
                    stream: Some(stream),
                    broken: false,
                })
            }
        }));

    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let pool = pool.clone();
            tokio::spawn(async move {
                let mut conn = pool.get().await?;
                let reply = conn.roundtrip(format!("ping {i}").as_bytes()).await?;
                println!("{} -> {}", conn.id(), String::from_utf8_lossy(&reply));
                Ok::<_, Box<dyn std::error::Error + Send + Sync>>(())
            })
        })
        .collect();

    for task in tasks {
        if let Err(e) = task.await? {
            eprintln!("request failed: {e}");
        }
    }

    println!("{:?}", pool.state());
    pool.close();
    Ok(())
}
