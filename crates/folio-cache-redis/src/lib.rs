//! Redis-backed cache for the Folio wiki.
//!
//! [`RedisCache`] implements [`Cache`] over a small pool of synchronous
//! connections.
//! Values are stored as plain strings with `SET ... EX`; pattern deletes walk
//! the keyspace with `SCAN` so the server is never blocked by `KEYS`.
//!
//! # Example
//!
//! ```ignore
//! use folio_cache::Cache;
//! use folio_cache_redis::RedisCache;
//!
//! let cache = RedisCache::connect("redis://localhost:6379/0")?;
//! cache.set("page:welcome", b"hello", None)?;
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use folio_cache::{Cache, CacheError};
use redis::{Client, Connection, RedisError, RedisResult};

/// Backend identifier for error messages.
const BACKEND: &str = "Redis";

/// Connect and per-command I/O timeout.
const TIMEOUT: Duration = Duration::from_secs(5);

/// Keys requested per `SCAN` round trip.
const SCAN_COUNT: usize = 100;

/// Idle connections kept for reuse.
const MAX_IDLE: usize = 8;

fn backend_error(err: RedisError) -> CacheError {
    CacheError::backend(BACKEND, err)
}

/// `EX` argument for a TTL. Redis rejects 0, so sub-second TTLs round up.
fn expiry_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

/// True when the connection can no longer be trusted and must be replaced.
fn is_broken(err: &RedisError) -> bool {
    err.is_connection_dropped() || err.is_io_error()
}

/// [`Cache`] stored on a Redis server.
///
/// Each call borrows an idle connection or opens a new one. Connections that
/// fail with an I/O error are dropped, so a restarted server is picked up by
/// the next call. A call that finds its connection dropped is retried once on
/// a fresh connection.
pub struct RedisCache {
    client: Client,
    idle: Mutex<Vec<Connection>>,
}

impl RedisCache {
    /// Open a connection and check it with `PING`.
    ///
    /// `url` has the form `redis://[:password@]host:port/db`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Backend`] when the URL is invalid or the server
    /// is unreachable. Callers typically fall back to
    /// [`NullCache`](folio_cache::NullCache).
    pub fn connect(url: &str) -> Result<Self, CacheError> {
        let client = Client::open(url).map_err(backend_error)?;
        let mut connection = open_connection(&client).map_err(backend_error)?;
        redis::cmd("PING")
            .query::<String>(&mut connection)
            .map_err(backend_error)?;
        tracing::debug!("Connected to Redis");

        Ok(Self {
            client,
            idle: Mutex::new(vec![connection]),
        })
    }

    fn idle(&self) -> MutexGuard<'_, Vec<Connection>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn checkout(&self) -> RedisResult<Connection> {
        match self.idle().pop() {
            Some(connection) => Ok(connection),
            None => open_connection(&self.client),
        }
    }

    fn release(&self, connection: Connection) {
        let mut idle = self.idle();
        if idle.len() < MAX_IDLE {
            idle.push(connection);
        }
    }

    /// Run `op` on a pooled connection.
    fn with_connection<T>(
        &self,
        mut op: impl FnMut(&mut Connection) -> RedisResult<T>,
    ) -> Result<T, CacheError> {
        let mut connection = self.checkout().map_err(backend_error)?;
        let err = match op(&mut connection) {
            Ok(value) => {
                self.release(connection);
                return Ok(value);
            }
            Err(err) if is_broken(&err) => err,
            Err(err) => {
                self.release(connection);
                return Err(backend_error(err));
            }
        };
        if !err.is_connection_dropped() {
            return Err(backend_error(err));
        }

        // A stale pooled connection, typically after a server restart.
        tracing::debug!(error = %err, "Redis connection dropped, reconnecting");
        self.idle().clear();
        let mut connection = open_connection(&self.client).map_err(backend_error)?;
        let value = op(&mut connection).map_err(backend_error)?;
        self.release(connection);
        Ok(value)
    }
}

fn open_connection(client: &Client) -> RedisResult<Connection> {
    let connection = client.get_connection_with_timeout(TIMEOUT)?;
    connection.set_read_timeout(Some(TIMEOUT))?;
    connection.set_write_timeout(Some(TIMEOUT))?;
    Ok(connection)
}

impl Cache for RedisCache {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.with_connection(|connection| redis::cmd("GET").arg(key).query(connection))
    }

    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("EX").arg(expiry_seconds(ttl));
        }
        self.with_connection(|connection| cmd.query::<()>(connection))
    }

    fn delete(&self, keys: &[&str]) -> Result<(), CacheError> {
        if keys.is_empty() {
            return Ok(());
        }
        self.with_connection(|connection| redis::cmd("DEL").arg(keys).query::<()>(connection))
    }

    fn delete_matching(&self, pattern: &str) -> Result<usize, CacheError> {
        let removed = self.with_connection(|connection| {
            let mut cursor: u64 = 0;
            let mut removed = 0;
            loop {
                let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(pattern)
                    .arg("COUNT")
                    .arg(SCAN_COUNT)
                    .query(connection)?;

                if !keys.is_empty() {
                    removed += redis::cmd("DEL").arg(&keys).query::<usize>(connection)?;
                }
                if next == 0 {
                    return Ok(removed);
                }
                cursor = next;
            }
        })?;

        tracing::debug!(pattern, removed, "Deleted matching cache keys");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;

    use super::*;

    /// Read one RESP command as its arguments, `None` at EOF.
    fn read_command(reader: &mut BufReader<TcpStream>) -> Option<Vec<Vec<u8>>> {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let count: usize = line.trim().strip_prefix('*')?.parse().ok()?;
        (0..count)
            .map(|_| {
                let mut header = String::new();
                reader.read_line(&mut header).ok()?;
                let len: usize = header.trim().strip_prefix('$')?.parse().ok()?;
                let mut data = vec![0; len + 2];
                reader.read_exact(&mut data).ok()?;
                data.truncate(len);
                Some(data)
            })
            .collect()
    }

    /// Answer commands like an empty Redis. `GET gone` always closes the
    /// connection without a reply, `GET flaky` only the first time.
    fn serve(stream: TcpStream, flaky_dropped: &AtomicBool) {
        let mut writer = stream.try_clone().unwrap();
        let mut reader = BufReader::new(stream);
        while let Some(args) = read_command(&mut reader) {
            let reply: &[u8] = match args[0].to_ascii_uppercase().as_slice() {
                b"PING" => b"+PONG\r\n",
                b"GET" if args[1] == b"gone" => return,
                b"GET" if args[1] == b"flaky" && !flaky_dropped.swap(true, Ordering::SeqCst) => {
                    return;
                }
                b"GET" => b"$-1\r\n",
                b"DEL" => b":0\r\n",
                _ => b"+OK\r\n",
            };
            if writer.write_all(reply).is_err() {
                return;
            }
        }
    }

    /// Start a local server; returns its URL and the count of accepted connections.
    fn fake_server() -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("redis://{}/0", listener.local_addr().unwrap());
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&accepted);
        let flaky_dropped = Arc::new(AtomicBool::new(false));

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                counter.fetch_add(1, Ordering::SeqCst);
                let flaky_dropped = Arc::clone(&flaky_dropped);
                thread::spawn(move || serve(stream, &flaky_dropped));
            }
        });
        (url, accepted)
    }

    #[test]
    fn test_reconnects_after_connection_loss() {
        let (url, accepted) = fake_server();
        let cache = RedisCache::connect(&url).unwrap();

        assert!(cache.get("gone").is_err());
        assert_eq!(cache.get("page").unwrap(), None);

        // initial, retry after the drop, replacement for the next call
        assert_eq!(accepted.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_dropped_connection_is_retried_once() {
        let (url, accepted) = fake_server();
        let cache = RedisCache::connect(&url).unwrap();

        assert_eq!(cache.get("flaky").unwrap(), None);
        cache.set("page", b"x", Some(Duration::from_secs(60))).unwrap();

        assert_eq!(accepted.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_connections_are_reused() {
        let (url, accepted) = fake_server();
        let cache = RedisCache::connect(&url).unwrap();

        for _ in 0..5 {
            cache.get("page").unwrap();
        }
        cache.delete(&["a", "b"]).unwrap();

        assert_eq!(accepted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_expiry_seconds_rounds_up_to_one() {
        assert_eq!(expiry_seconds(Duration::from_millis(200)), 1);
        assert_eq!(expiry_seconds(Duration::from_secs(900)), 900);
    }

    #[test]
    fn test_connect_rejects_bad_url() {
        let err = RedisCache::connect("not a url").err().unwrap();

        assert!(matches!(err, CacheError::Backend { backend: "Redis", .. }));
    }

    #[test]
    fn test_connect_unreachable_server() {
        // Port 1 is reserved and refuses connections.
        let err = RedisCache::connect("redis://127.0.0.1:1/0").err().unwrap();

        assert!(matches!(err, CacheError::Backend { .. }));
    }

    #[test]
    fn test_cache_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RedisCache>();
    }
}
