//! Single-instance guard.
//!
//! The first instance binds a local socket named after the application; any
//! later instance finds the socket alive, forwards its command-line
//! arguments through it, and exits. The first instance polls for forwarded
//! arguments and dispatches them like fresh command-line input.

use std::fs;
use std::path::PathBuf;

#[cfg(unix)]
use std::io::{Read, Write};
#[cfg(unix)]
use std::os::unix::net::{UnixListener, UnixStream};

use log::{info, warn};

use crate::app_dirs;

pub struct StartCop {
    socket_path: PathBuf,
    #[cfg(unix)]
    listener: Option<UnixListener>,
}

impl StartCop {
    pub fn new(name: &str) -> Self {
        Self {
            socket_path: app_dirs::runtime_socket(name),
            #[cfg(unix)]
            listener: None,
        }
    }

    /// True when another instance is already serving; this instance's
    /// arguments have then been forwarded and the caller should exit 0.
    /// Otherwise this instance becomes the server.
    pub fn exists(&mut self, args: &[String]) -> bool {
        #[cfg(unix)]
        {
            if let Ok(mut stream) = UnixStream::connect(&self.socket_path) {
                info!("deferring to the running instance");
                if let Err(e) = stream.write_all(args.join("\n").as_bytes()) {
                    warn!("failed to forward arguments: {e}");
                }
                return true;
            }

            // Nothing listening: clear any stale socket and take over.
            let _ = fs::remove_file(&self.socket_path);

            match UnixListener::bind(&self.socket_path) {
                Ok(listener) => {
                    if let Err(e) = listener.set_nonblocking(true) {
                        warn!("single-instance listener degraded: {e}");
                    }
                    self.listener = Some(listener);
                }
                Err(e) => warn!("could not bind single-instance socket: {e}"),
            }

            false
        }

        #[cfg(not(unix))]
        {
            let _ = args;
            false
        }
    }

    /// Arguments forwarded by later instances since the last poll, one
    /// batch per connecting process.
    pub fn poll_forwarded(&mut self) -> Vec<String> {
        #[cfg(unix)]
        {
            let Some(listener) = &self.listener else {
                return Vec::new();
            };

            let mut forwarded = Vec::new();
            while let Ok((mut stream, _)) = listener.accept() {
                // The accepted stream inherits non-blocking mode; the read
                // itself should wait for the short payload.
                let _ = stream.set_nonblocking(false);
                let mut payload = String::new();
                if stream.read_to_string(&mut payload).is_ok() {
                    forwarded.extend(
                        payload
                            .lines()
                            .filter(|l| !l.is_empty())
                            .map(str::to_string),
                    );
                }
            }

            forwarded
        }

        #[cfg(not(unix))]
        {
            Vec::new()
        }
    }
}

impl Drop for StartCop {
    fn drop(&mut self) {
        #[cfg(unix)]
        if self.listener.is_some() {
            let _ = fs::remove_file(&self.socket_path);
        }
    }
}
