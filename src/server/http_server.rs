use super::request::RawRequest;
use super::response::HttpResponse;
use super::service::AppService;
use crate::worker_pool::{Submitter, WorkerPool, WorkerPoolConfig, WorkerPoolError};
use http::StatusCode;
use may::sync::mpsc;
use std::io::{self, Read};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// How long `stop` waits for IO threads stuck on a slow client
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Listener for one address.
///
/// Socket IO happens on a fixed set of OS threads that pull requests straight from `tiny_http`.
/// Each thread reads the body, queues the request on the `may` worker pool, waits for the
/// [`HttpResponse`] and writes it back, so a stalled client only ever holds one IO thread and
/// never a coroutine scheduler thread.
pub struct HttpServer {
    service: AppService,
    workers: WorkerPoolConfig,
}

/// A request on its way to a worker coroutine, with the channel its response goes back on
struct PipelineJob {
    raw: RawRequest,
    reply: mpsc::Sender<HttpResponse>,
}

/// Handle to a running listener
///
/// Dropping the handle stops the listener.
pub struct ServerHandle {
    addr: SocketAddr,
    server: Arc<tiny_http::Server>,
    io_threads: Vec<thread::JoinHandle<()>>,
    pool: Option<WorkerPool<PipelineJob>>,
}

impl HttpServer {
    pub fn new(service: AppService, workers: WorkerPoolConfig) -> Self {
        Self { service, workers }
    }

    /// Bind `addr` and start accepting
    ///
    /// One IO thread is started per worker coroutine.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound or the worker pool cannot be spawned.
    pub fn start(self, addr: &str) -> io::Result<ServerHandle> {
        let server = tiny_http::Server::http(addr)
            .map_err(|e| io::Error::new(io::ErrorKind::AddrNotAvailable, e.to_string()))?;
        let local = server
            .server_addr()
            .to_ip()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "not an IP listener"))?;
        let server = Arc::new(server);

        let service = self.service;
        let pool = WorkerPool::new(format!("http-{local}"), self.workers, move |job: PipelineJob| {
            let resp = service.handle(&job.raw);
            if job.reply.send(resp).is_err() {
                debug!("IO thread gave up before the response was ready");
            }
        })
        .map_err(pool_error)?;

        let mut handle = ServerHandle {
            addr: local,
            server,
            io_threads: Vec::with_capacity(self.workers.num_workers),
            pool: None,
        };
        for index in 0..self.workers.num_workers {
            let server = Arc::clone(&handle.server);
            let submitter = pool.submitter().map_err(pool_error)?;
            let spawned = thread::Builder::new()
                .name(format!("http-io-{local}-{index}"))
                .spawn(move || io_loop(&server, &submitter, local));
            match spawned {
                Ok(thread) => handle.io_threads.push(thread),
                Err(e) => {
                    // dropping the handle unblocks and joins the threads already running
                    handle.pool = Some(pool);
                    return Err(e);
                }
            }
        }
        handle.pool = Some(pool);

        info!(
            addr = %local,
            workers = self.workers.num_workers,
            io_threads = handle.io_threads.len(),
            "Listening"
        );
        Ok(handle)
    }
}

fn pool_error(e: WorkerPoolError) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e.to_string())
}

/// Pull requests until the server is unblocked. Runs on an OS thread.
fn io_loop(server: &tiny_http::Server, submitter: &Submitter<PipelineJob>, addr: SocketAddr) {
    for mut request in server.incoming_requests() {
        let resp = match to_raw_request(&mut request) {
            Ok(raw) => run_pipeline(submitter, raw),
            Err(e) => {
                debug!(addr = %addr, error = %e, "Failed to read request body");
                HttpResponse::json_error(StatusCode::BAD_REQUEST, "unreadable request body")
            }
        };
        if let Err(e) = request.respond(to_tiny_response(resp)) {
            debug!(addr = %addr, error = %e, "Client went away before the response was written");
        }
    }
    debug!(addr = %addr, "IO thread finished");
}

fn run_pipeline(submitter: &Submitter<PipelineJob>, raw: RawRequest) -> HttpResponse {
    let (reply, response) = mpsc::channel();
    if submitter.submit(PipelineJob { raw, reply }).is_err() {
        return HttpResponse::json_error(StatusCode::SERVICE_UNAVAILABLE, "server is stopping");
    }
    match response.recv() {
        Ok(resp) => resp,
        Err(_) => {
            error!("Worker dropped the request without a response");
            HttpResponse::json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

fn to_raw_request(request: &mut tiny_http::Request) -> io::Result<RawRequest> {
    let mut raw = RawRequest::new(request.method().as_str(), request.url());
    for header in request.headers() {
        raw = raw.with_header(header.field.as_str().as_str(), header.value.as_str());
    }
    if let Some(addr) = request.remote_addr() {
        raw = raw.with_remote_addr(*addr);
    }
    let mut body = Vec::new();
    request.as_reader().read_to_end(&mut body)?;
    Ok(raw.with_body(body))
}

fn to_tiny_response(resp: HttpResponse) -> tiny_http::Response<io::Cursor<Vec<u8>>> {
    let headers: Vec<(String, String)> = resp
        .wire_headers()
        .map(|(name, value)| (name.to_string(), value))
        .collect();
    let mut out = tiny_http::Response::from_data(resp.body).with_status_code(resp.status.as_u16());
    for (name, value) in headers {
        match tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            Ok(header) => out.add_header(header),
            Err(()) => warn!(header = %name, "Dropping header that is not valid ASCII"),
        }
    }
    out
}

impl ServerHandle {
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the listener to accept TCP connections
    ///
    /// # Errors
    ///
    /// Returns `TimedOut` if the listener is not reachable within ~250ms (50 attempts × 5ms).
    pub fn wait_ready(&self) -> io::Result<()> {
        for _ in 0..50 {
            if TcpStream::connect(self.addr).is_ok() {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"))
    }

    /// Stop accepting, answer the requests already received, then release the port
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.io_threads.is_empty() && self.pool.is_none() {
            return;
        }
        // unblock messages queue behind pending requests, one per IO thread
        for _ in &self.io_threads {
            self.server.unblock();
        }
        let deadline = Instant::now() + STOP_GRACE;
        for thread in self.io_threads.drain(..) {
            while !thread.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(5));
            }
            if !thread.is_finished() {
                warn!(addr = %self.addr, "IO thread still busy with a client, detaching it");
                continue;
            }
            if thread.join().is_err() {
                error!(addr = %self.addr, "IO thread panicked");
            }
        }
        if let Some(mut pool) = self.pool.take() {
            pool.shutdown();
        }
        info!(addr = %self.addr, "Stopped listening");
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerHandle")
            .field("addr", &self.addr)
            .field("io_threads", &self.io_threads.len())
            .field("running", &self.pool.is_some())
            .finish_non_exhaustive()
    }
}
