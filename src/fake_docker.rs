//! A scripted Docker Engine API endpoint on a Unix socket, enough for bollard
//! to talk to in tests.

use std::{
    collections::VecDeque,
    io,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use bollard::{Docker, API_DEFAULT_VERSION};
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    net::{UnixListener, UnixStream},
};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    /// Path and query, without the API version prefix.
    pub path: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub enum Reply {
    Json(u16, String),
    Empty(u16),
    /// Hijacked exec stream: multiplexed frames of (stream type, payload).
    Stream(Vec<(u8, String)>),
}

impl Reply {
    pub fn json(status: u16, body: &str) -> Self {
        Reply::Json(status, body.to_string())
    }

    pub fn empty(status: u16) -> Self {
        Reply::Empty(status)
    }

    pub fn stream(frames: Vec<(u8, &str)>) -> Self {
        Reply::Stream(
            frames
                .into_iter()
                .map(|(kind, payload)| (kind, payload.to_string()))
                .collect(),
        )
    }
}

struct Route {
    method: &'static str,
    pattern: &'static str,
    replies: VecDeque<Reply>,
}

impl Route {
    fn matches(&self, method: &str, path: &str) -> bool {
        let path = path.split('?').next().unwrap_or_default();
        let expected = self.pattern.split('/').collect::<Vec<_>>();
        let actual = path.split('/').collect::<Vec<_>>();
        self.method == method
            && expected.len() == actual.len()
            && expected
                .iter()
                .zip(&actual)
                .all(|(e, a)| *e == "*" || e == a)
    }

    /// Replies are served in order, the last one repeats.
    fn next_reply(&mut self) -> Reply {
        if self.replies.len() > 1 {
            self.replies.pop_front().unwrap_or(Reply::Empty(500))
        } else {
            self.replies.front().cloned().unwrap_or(Reply::Empty(500))
        }
    }
}

#[derive(Default)]
struct State {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<Request>>,
}

impl State {
    fn reply(&self, request: &Request) -> Reply {
        self.requests.lock().unwrap().push(request.clone());
        let mut routes = self.routes.lock().unwrap();
        match routes
            .iter_mut()
            .find(|r| r.matches(&request.method, &request.path))
        {
            Some(route) => route.next_reply(),
            None => Reply::json(404, r#"{"message":"no such route"}"#),
        }
    }
}

pub struct FakeDocker {
    state: Arc<State>,
    socket: PathBuf,
}

impl FakeDocker {
    pub fn new() -> Self {
        Self {
            state: Arc::default(),
            socket: std::env::temp_dir().join(format!("fake-docker-{}.sock", Uuid::new_v4())),
        }
    }

    /// Adds a reply for `method` on `pattern`, where `*` matches one path
    /// segment. Repeated calls for the same route queue more replies.
    pub fn on(self, method: &'static str, pattern: &'static str, reply: Reply) -> Self {
        {
            let mut routes = self.state.routes.lock().unwrap();
            match routes
                .iter_mut()
                .find(|r| r.method == method && r.pattern == pattern)
            {
                Some(route) => route.replies.push_back(reply),
                None => routes.push(Route {
                    method,
                    pattern,
                    replies: VecDeque::from([reply]),
                }),
            }
        }
        self
    }

    /// Starts listening and returns a client connected to the socket.
    pub fn start(&self) -> Docker {
        let listener = UnixListener::bind(&self.socket).unwrap();
        let state = self.state.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = state.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, state).await;
                });
            }
        });

        Docker::connect_with_unix(&self.socket.to_string_lossy(), 5, API_DEFAULT_VERSION).unwrap()
    }

    pub fn requests(&self) -> Vec<Request> {
        self.state.requests.lock().unwrap().clone()
    }
}

impl Drop for FakeDocker {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket);
    }
}

fn strip_version(path: &str) -> &str {
    match path.strip_prefix("/v") {
        Some(rest) => rest.find('/').map_or(path, |i| &rest[i..]),
        None => path,
    }
}

async fn serve(stream: UnixStream, state: Arc<State>) -> io::Result<()> {
    let mut reader = BufReader::new(stream);
    loop {
        let mut request_line = String::new();
        if reader.read_line(&mut request_line).await? == 0 {
            return Ok(());
        }
        let mut parts = request_line.split_whitespace();
        let method = parts.next().unwrap_or_default().to_string();
        let path = strip_version(parts.next().unwrap_or_default()).to_string();

        let mut content_length = 0;
        loop {
            let mut header = String::new();
            if reader.read_line(&mut header).await? == 0 {
                return Ok(());
            }
            let header = header.trim_end();
            if header.is_empty() {
                break;
            }
            if let Some((name, value)) = header.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
            }
        }

        let mut body = vec![0; content_length];
        reader.read_exact(&mut body).await?;

        let request = Request {
            method,
            path,
            body: String::from_utf8_lossy(&body).into_owned(),
        };
        let reply = state.reply(&request);

        let stream = reader.get_mut();
        match reply {
            Reply::Json(status, body) => {
                let head = format!(
                    "HTTP/1.1 {status} OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
                    body.len()
                );
                stream.write_all(head.as_bytes()).await?;
                stream.write_all(body.as_bytes()).await?;
            }
            Reply::Empty(204) => {
                stream.write_all(b"HTTP/1.1 204 No Content\r\n\r\n").await?;
            }
            Reply::Empty(status) => {
                let head = format!("HTTP/1.1 {status} OK\r\nContent-Length: 0\r\n\r\n");
                stream.write_all(head.as_bytes()).await?;
            }
            Reply::Stream(frames) => {
                stream
                    .write_all(
                        b"HTTP/1.1 101 UPGRADED\r\n\
                          Content-Type: application/vnd.docker.raw-stream\r\n\
                          Connection: Upgrade\r\n\
                          Upgrade: tcp\r\n\r\n",
                    )
                    .await?;
                for (kind, payload) in frames {
                    let mut frame = vec![kind, 0, 0, 0];
                    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
                    frame.extend_from_slice(payload.as_bytes());
                    stream.write_all(&frame).await?;
                }
                stream.shutdown().await?;
                return Ok(());
            }
        }
        stream.flush().await?;
    }
}
