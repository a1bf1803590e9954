//! Admission of new connections as router channels.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, warn};

use portmux_protocol::ChannelId;

use crate::dispatch::{DispatchError, Dispatcher};
use crate::router::Router;
use crate::transport::{
    ConnectionHandler, ConnectionStream, FrameReader, SocketTransport, TRANSPORT_TARGET,
};

/// Admits each accepted connection and serves its frames until it closes.
pub(crate) struct AdmissionHandler {
    dispatcher: Dispatcher,
    max_frame_bytes: usize,
    open: Mutex<HashMap<ChannelId, ConnectionStream>>,
    served: Condvar,
}

impl AdmissionHandler {
    pub(crate) fn new(router: Arc<Router>, max_frame_bytes: usize) -> Self {
        Self {
            dispatcher: Dispatcher::new(router),
            max_frame_bytes,
            open: Mutex::new(HashMap::new()),
            served: Condvar::new(),
        }
    }

    /// Number of connections still being served.
    pub(crate) fn open_connections(&self) -> usize {
        self.lock_open().len()
    }

    /// Shuts down every open connection and waits at most `budget` for their
    /// threads to finish. Returns how many were still open when it gave up.
    pub(crate) fn close_all(&self, budget: Duration) -> usize {
        let open = self.lock_open();
        for (channel, stream) in open.iter() {
            if let Err(error) = stream.shutdown() {
                debug!(
                    target: TRANSPORT_TARGET,
                    %channel,
                    error = %error,
                    "connection already closed"
                );
            }
        }
        let (open, _) = self
            .served
            .wait_timeout_while(open, budget, |open| !open.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        open.len()
    }

    fn track(&self, channel: ChannelId, stream: &ConnectionStream) {
        match stream.try_clone() {
            Ok(handle) => {
                self.lock_open().insert(channel, handle);
            }
            Err(error) => warn!(
                target: TRANSPORT_TARGET,
                %channel,
                error = %error,
                "connection cannot be closed on shutdown"
            ),
        }
    }

    fn untrack(&self, channel: ChannelId) {
        self.lock_open().remove(&channel);
        self.served.notify_all();
    }

    fn lock_open(&self) -> MutexGuard<'_, HashMap<ChannelId, ConnectionStream>> {
        self.open.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn serve(&self, channel: ChannelId, stream: ConnectionStream) {
        let router = self.dispatcher.router();
        let mut reader = FrameReader::new(stream, self.max_frame_bytes);
        loop {
            let outcome = match reader.next_frame() {
                Ok(Some(line)) => self.dispatcher.dispatch_line(channel, &line),
                Ok(None) => break,
                Err(error) => Err(DispatchError::from(error)),
            };
            let Err(error) = outcome else {
                continue;
            };
            warn!(
                target: TRANSPORT_TARGET,
                %channel,
                error = %error,
                "frame rejected"
            );
            if let Some(notice) = error.notice() {
                router.deliver(channel, notice);
            }
            if error.is_fatal() {
                break;
            }
        }
        // The write half may outlive this loop in the registry, so close the
        // socket itself.
        if let Err(error) = reader.get_ref().shutdown() {
            debug!(
                target: TRANSPORT_TARGET,
                %channel,
                error = %error,
                "connection already closed"
            );
        }
    }
}

impl ConnectionHandler for AdmissionHandler {
    fn handle(&self, stream: ConnectionStream) {
        let writer = match stream.try_clone() {
            Ok(writer) => writer,
            Err(error) => {
                warn!(
                    target: TRANSPORT_TARGET,
                    error = %error,
                    "failed to split connection"
                );
                return;
            }
        };
        let router = self.dispatcher.router();
        let channel = match router.admit(Arc::new(SocketTransport::new(writer))) {
            Ok(channel) => channel,
            Err(error) => {
                warn!(
                    target: TRANSPORT_TARGET,
                    error = %error,
                    "connection not admitted"
                );
                return;
            }
        };

        self.track(channel, &stream);
        self.serve(channel, stream);

        debug!(target: TRANSPORT_TARGET, %channel, "connection closed");
        router.disconnected(channel);
        self.untrack(channel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{BackendEngine, ForwardedRequest, InternalChannel};
    use crate::placeholder_engine::PlaceholderEngine;
    use crate::router::RouterSettings;
    use crate::tests::support::RecordingHealthReporter;
    use crate::transport::test_utils::wait_until;
    use serde_json::{Map, Value, json};
    use std::io::{BufRead, BufReader, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    struct EchoChannel;

    impl InternalChannel for EchoChannel {
        fn send(&self, request: ForwardedRequest) {
            let mut body = Map::new();
            body.insert("echo".to_owned(), Value::Object(request.body.clone()));
            request.respond(body);
        }

        fn close(&self) {}

        fn unsubscribe(&self, _request: Value) {}
    }

    fn router(settings: RouterSettings) -> Arc<Router> {
        let engine: Arc<dyn BackendEngine> = Arc::new(PlaceholderEngine::new());
        let router = Arc::new(Router::new(
            engine,
            Arc::new(RecordingHealthReporter::default()),
            settings,
        ));
        router.backend_slot().provide(Arc::new(EchoChannel));
        router
    }

    fn serve_one(router: &Arc<Router>, limit: usize) -> (TcpStream, thread::JoinHandle<()>) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind");
        let addr = listener.local_addr().expect("addr");
        let handler = AdmissionHandler::new(Arc::clone(router), limit);
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            handler.handle(ConnectionStream::Tcp(stream));
        });
        (TcpStream::connect(addr).expect("connect"), server)
    }

    fn read_json(reader: &mut impl BufRead) -> Value {
        let mut line = String::new();
        reader.read_line(&mut line).expect("read line");
        serde_json::from_str(&line).expect("json line")
    }

    #[test]
    fn handshake_then_echoed_reply_then_release() {
        let router = router(RouterSettings::default());
        let (mut client, server) = serve_one(&router, 1024);
        let mut reader = BufReader::new(client.try_clone().expect("clone"));

        assert_eq!(
            read_json(&mut reader),
            json!({"kind": "channelId", "channelId": 1_000_000})
        );
        client
            .write_all(b"{\"correlationId\":1000001,\"payload\":\"x\"}\n")
            .expect("write");
        assert_eq!(
            read_json(&mut reader),
            json!({"correlationId": 1_000_001, "echo": {"payload": "x"}})
        );

        drop(reader);
        drop(client);
        server.join().expect("join server");
        assert_eq!(router.channel_count(), 0);
    }

    #[test]
    fn malformed_frames_get_error_notice_and_connection_survives() {
        let router = router(RouterSettings::default());
        let (mut client, server) = serve_one(&router, 1024);
        let mut reader = BufReader::new(client.try_clone().expect("clone"));
        read_json(&mut reader);

        client.write_all(b"{\"payload\":1}\n").expect("write");
        let notice = read_json(&mut reader);
        assert_eq!(notice["kind"], "error");

        client
            .write_all(b"{\"controlOp\":\"query-started\"}\n")
            .expect("write");
        assert_eq!(
            read_json(&mut reader),
            json!({"controlOp": "query-started", "started": false})
        );

        drop(reader);
        drop(client);
        server.join().expect("join server");
    }

    #[test]
    fn oversize_frame_drops_the_connection() {
        let router = router(RouterSettings::default());
        let (mut client, server) = serve_one(&router, 32);
        let mut reader = BufReader::new(client.try_clone().expect("clone"));
        read_json(&mut reader);

        let mut frame = vec![b'x'; 64];
        frame.push(b'\n');
        client.write_all(&frame).expect("write");
        let notice = read_json(&mut reader);
        assert_eq!(notice["message"], "frame exceeds the 32 byte limit");

        server.join().expect("join server");
        assert!(wait_until(|| router.channel_count() == 0));
    }

    #[test]
    fn disconnected_channels_stay_registered_when_configured() {
        let settings = RouterSettings {
            release_on_disconnect: false,
            ..RouterSettings::default()
        };
        let router = router(settings);
        let (client, server) = serve_one(&router, 1024);
        let mut reader = BufReader::new(client.try_clone().expect("clone"));
        read_json(&mut reader);

        drop(reader);
        drop(client);
        server.join().expect("join server");
        assert_eq!(router.channel_count(), 1);
    }

    #[test]
    fn fatal_frame_closes_a_retained_connection() {
        let settings = RouterSettings {
            release_on_disconnect: false,
            ..RouterSettings::default()
        };
        let router = router(settings);
        let (mut client, server) = serve_one(&router, 32);
        client
            .set_read_timeout(Some(std::time::Duration::from_secs(5)))
            .expect("read timeout");
        let mut reader = BufReader::new(client.try_clone().expect("clone"));
        read_json(&mut reader);

        let mut frame = vec![b'x'; 64];
        frame.push(b'\n');
        client.write_all(&frame).expect("write");
        assert_eq!(read_json(&mut reader)["kind"], "error");

        server.join().expect("join server");
        let mut rest = String::new();
        assert_eq!(reader.read_line(&mut rest).expect("read eof"), 0);
        assert_eq!(router.channel_count(), 1);
    }

    #[test]
    fn close_all_ends_idle_connections_within_the_budget() {
        let router = router(RouterSettings::default());
        let handler = Arc::new(AdmissionHandler::new(Arc::clone(&router), 1024));
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind");
        let addr = listener.local_addr().expect("addr");
        let serving = Arc::clone(&handler);
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            serving.handle(ConnectionStream::Tcp(stream));
        });
        let client = TcpStream::connect(addr).expect("connect");
        client
            .set_read_timeout(Some(std::time::Duration::from_secs(5)))
            .expect("read timeout");
        let mut reader = BufReader::new(client);
        read_json(&mut reader);
        assert!(wait_until(|| handler.open_connections() == 1));

        assert_eq!(handler.close_all(Duration::from_secs(5)), 0);
        let mut rest = String::new();
        assert_eq!(reader.read_line(&mut rest).expect("read eof"), 0);
        server.join().expect("join server");
        assert_eq!(router.channel_count(), 0);
    }
}
