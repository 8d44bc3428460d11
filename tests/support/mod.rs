use std::{
    io::Read,
    net::{SocketAddr, TcpListener},
    process::{Child, Command, ExitStatus, Stdio},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::Mutex,
    time::sleep,
};

// -----------------------------------------------------------------------------
// ----- Ports -----------------------------------------------------------------

pub fn reserve_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().unwrap()
}

pub async fn wait_for_listen(addr: SocketAddr) {
    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        sleep(Duration::from_millis(50)).await;
    }
    panic!("slotgate did not start listening on {addr}");
}

// -----------------------------------------------------------------------------
// ----- Slotgate Process ------------------------------------------------------

#[allow(dead_code)]
pub struct Slotgate {
    pub listen: SocketAddr,
    pub stats: SocketAddr,
    child: Child,
}

#[allow(dead_code)]
impl Slotgate {
    pub async fn start(proxy: SocketAddr, concurrency: usize) -> Self {
        let listen = reserve_addr();
        let stats = reserve_addr();

        let child = spawn_slotgate(&[
            "-l",
            &listen.to_string(),
            "-p",
            &proxy.to_string(),
            "-s",
            &stats.to_string(),
            "-c",
            &concurrency.to_string(),
        ]);

        // The relay is bound before stats; probing it would open a real session.
        wait_for_listen(stats).await;

        Self {
            listen,
            stats,
            child,
        }
    }

    pub async fn stats_line(&self) -> String {
        let mut stream = TcpStream::connect(self.stats).await.unwrap();
        let mut line = String::new();
        stream.read_to_string(&mut line).await.unwrap();
        line
    }

    pub async fn wait_for_stats(&self, want: &str) {
        let mut last = String::new();
        for _ in 0..100 {
            last = self.stats_line().await;
            if last == want {
                return;
            }
            sleep(Duration::from_millis(20)).await;
        }
        panic!("stats never reported {want:?}, last {last:?}");
    }

    /// Sends SIGINT, as Ctrl-C in a terminal would.
    pub fn interrupt(&self) {
        let status = Command::new("kill")
            .args(["-INT", &self.child.id().to_string()])
            .status()
            .expect("run kill");
        assert!(status.success(), "kill -INT failed: {status}");
    }

    pub async fn wait_for_exit(&mut self) -> ExitStatus {
        wait_for_exit(&mut self.child).await
    }
}

impl Drop for Slotgate {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub fn spawn_slotgate(args: &[&str]) -> Child {
    slotgate_command(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn slotgate")
}

/// Like `spawn_slotgate`, but stdout and stderr are kept for `read_output`.
#[allow(dead_code)]
pub fn spawn_slotgate_captured(args: &[&str]) -> Child {
    slotgate_command(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn slotgate")
}

/// Drains (stdout, stderr) of an exited captured child.
#[allow(dead_code)]
pub fn read_output(child: &mut Child) -> (String, String) {
    let mut out = String::new();
    let mut err = String::new();
    if let Some(mut stdout) = child.stdout.take() {
        stdout.read_to_string(&mut out).unwrap();
    }
    if let Some(mut stderr) = child.stderr.take() {
        stderr.read_to_string(&mut err).unwrap();
    }
    (out, err)
}

fn slotgate_command(args: &[&str]) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_slotgate"));
    cmd.args(args).env("SLOTGATE_LOG", "warn").env("NO_COLOR", "1");
    cmd
}

#[allow(dead_code)]
pub async fn wait_for_exit(child: &mut Child) -> ExitStatus {
    for _ in 0..100 {
        if let Some(status) = child.try_wait().unwrap() {
            return status;
        }
        sleep(Duration::from_millis(50)).await;
    }
    let _ = child.kill();
    panic!("slotgate kept running");
}

// -----------------------------------------------------------------------------
// ----- Backends --------------------------------------------------------------

#[allow(dead_code)]
pub async fn spawn_echo_backend() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                loop {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if stream.write_all(&buf[..n]).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }
    });

    addr
}

/// Keeps every accepted connection open until `close_oldest` is called.
#[allow(dead_code)]
pub struct HoldingBackend {
    pub addr: SocketAddr,
    accepted: Arc<AtomicUsize>,
    held: Arc<Mutex<Vec<TcpStream>>>,
}

#[allow(dead_code)]
impl HoldingBackend {
    pub async fn spawn() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let held = Arc::new(Mutex::new(Vec::new()));

        let accepted_clone = accepted.clone();
        let held_clone = held.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                held_clone.lock().await.push(stream);
                accepted_clone.fetch_add(1, Ordering::SeqCst);
            }
        });

        Self {
            addr,
            accepted,
            held,
        }
    }

    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    pub async fn wait_for_accepted(&self, n: usize) {
        for _ in 0..200 {
            if self.accepted() >= n {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("backend accepted {} connections, wanted {n}", self.accepted());
    }

    pub async fn close_oldest(&self) {
        let mut held = self.held.lock().await;
        assert!(!held.is_empty(), "no backend connection to close");
        drop(held.remove(0));
    }
}
