//! Shared harness for the end-to-end specs

use std::path::PathBuf;
use std::time::{Duration, Instant};

use lg_core::{HolderToken, LeaseSnapshot, ResourceId};
use lg_daemon::lifecycle::LifecycleError;
use lg_daemon::protocol;
use lg_daemon::{run, startup, Config, ProjectConfig, ShutdownHandle, CONFIG_FILE};
use tempfile::TempDir;
use tokio::net::UnixStream;
use tokio::task::JoinHandle;

pub use lg_daemon::{Request, Response};

/// How long `wait_*` helpers poll before failing the test
pub const WAIT: Duration = Duration::from_secs(5);

const RESOURCES: &str = r#"
[[resource]]
id = "G1"
title = "Planets"
outputs = [1, 2, 3]

[[resource]]
id = "G2"
title = "Moons"
outputs = [4]
"#;

/// Sweep settings short enough to observe in a test
pub const FAST_SWEEP: &str = r#"
[sweep]
interval = "50ms"
grace = "150ms"
"#;

pub fn g1() -> ResourceId {
    ResourceId::new("G1")
}

/// A temporary project directory with an `lg.toml` and a device file
pub struct Project {
    dir: TempDir,
    config: Config,
}

impl Project {
    pub fn new() -> Self {
        Self::with_config("")
    }

    /// `extra` is appended after the `[device]` table, so it may add
    /// `[device.pins]` or a `[sweep]` section
    pub fn with_config(extra: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("project");
        std::fs::create_dir_all(&root).unwrap();

        let toml = format!(
            "{}\n[device]\nsink = \"line\"\npath = {:?}\n{}\n",
            RESOURCES,
            dir.path().join("device.log"),
            extra
        );
        std::fs::write(root.join(CONFIG_FILE), toml).unwrap();

        let config =
            Config::with_dirs(&root, &dir.path().join("state"), &dir.path().join("sock")).unwrap();
        Self { dir, config }
    }

    pub async fn start(&self) -> Daemon {
        let project = ProjectConfig::load(&self.config.project_root).unwrap();
        let state = startup(&self.config, &project).await.unwrap();
        let shutdown = state.shutdown_handle();
        Daemon {
            socket: self.config.socket_path.clone(),
            shutdown,
            task: tokio::spawn(run(state)),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Lines written to the output device so far
    pub fn device_lines(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir.path().join("device.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub async fn wait_for_device_lines(&self, count: usize) -> Vec<String> {
        let start = Instant::now();
        loop {
            let lines = self.device_lines();
            if lines.len() >= count {
                return lines;
            }
            assert!(
                start.elapsed() < WAIT,
                "expected {} device lines, got {:?}",
                count,
                lines
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// A running daemon serving one project
pub struct Daemon {
    socket: PathBuf,
    shutdown: ShutdownHandle,
    task: JoinHandle<Result<(), LifecycleError>>,
}

impl Daemon {
    pub async fn connect(&self) -> Conn {
        Conn {
            stream: UnixStream::connect(&self.socket).await.unwrap(),
        }
    }

    pub async fn stop(self) {
        self.shutdown.request();
        self.task.await.unwrap().unwrap();
    }
}

/// One client connection, which is also one presence entry
pub struct Conn {
    stream: UnixStream,
}

impl Conn {
    pub async fn call(&mut self, request: Request) -> Response {
        let data = protocol::encode(&request).unwrap();
        protocol::write_message(&mut self.stream, &data)
            .await
            .unwrap();
        let bytes = protocol::read_message(&mut self.stream).await.unwrap();
        protocol::decode(&bytes).unwrap()
    }

    pub async fn acquire(&mut self, resource: &ResourceId) -> Response {
        self.call(Request::Acquire {
            resource: resource.clone(),
        })
        .await
    }

    /// Acquire, failing the test unless the lease is granted
    pub async fn acquire_token(&mut self, resource: &ResourceId) -> HolderToken {
        match self.acquire(resource).await {
            Response::Acquired { token, .. } => token,
            other => panic!("expected Acquired for {}, got {:?}", resource, other),
        }
    }

    pub async fn bind(&mut self, resource: &ResourceId, token: &HolderToken) {
        let response = self
            .call(Request::Bind {
                resource: resource.clone(),
                token: token.clone(),
            })
            .await;
        assert_eq!(response, Response::Ok);
    }

    /// Acquire and carry the token in this connection's presence
    pub async fn hold(&mut self, resource: &ResourceId) -> HolderToken {
        let token = self.acquire_token(resource).await;
        self.bind(resource, &token).await;
        token
    }

    pub async fn query(&mut self, resource: &ResourceId) -> LeaseSnapshot {
        match self
            .call(Request::Query {
                resource: resource.clone(),
            })
            .await
        {
            Response::Lease { lease } => lease,
            other => panic!("expected Lease, got {:?}", other),
        }
    }

    pub async fn online(&mut self) -> usize {
        match self.call(Request::Status).await {
            Response::Status { online, .. } => online,
            other => panic!("expected Status, got {:?}", other),
        }
    }

    pub async fn wait_until_free(&mut self, resource: &ResourceId) {
        let start = Instant::now();
        while self.query(resource).await.busy {
            assert!(start.elapsed() < WAIT, "{} was never freed", resource);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Wait until exactly `count` connections are present
    pub async fn wait_for_online(&mut self, count: usize) {
        let start = Instant::now();
        loop {
            let online = self.online().await;
            if online == count {
                return;
            }
            assert!(
                start.elapsed() < WAIT,
                "expected {} online, got {}",
                count,
                online
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}
