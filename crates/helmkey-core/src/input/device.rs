// ── Device node access ──
//
// The engine only ever reads from an input device. Opening goes through
// `DeviceOpener` so autodetection and ingestion can run against
// in-memory streams as well as real `/dev/input` nodes.

use std::io;
use std::path::{Path, PathBuf};

use tokio::io::AsyncRead;

/// A readable byte stream from an input device.
pub type DeviceReader = Box<dyn AsyncRead + Send + Unpin>;

/// Opens device nodes for reading. Dropping the returned reader closes it.
pub trait DeviceOpener: Send + Sync {
    fn open(&self, path: &Path) -> io::Result<DeviceReader>;
}

/// Opens real device nodes from the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsOpener;

impl DeviceOpener for FsOpener {
    fn open(&self, path: &Path) -> io::Result<DeviceReader> {
        #[cfg(unix)]
        {
            unix::open(path)
        }
        #[cfg(not(unix))]
        {
            let file = std::fs::File::open(path)?;
            Ok(Box::new(tokio::fs::File::from_std(file)))
        }
    }
}

/// Every `event*` node directly under `dir`, sorted by name.
pub async fn list_event_nodes(dir: &Path) -> Vec<PathBuf> {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return Vec::new();
    };

    let mut nodes = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.file_name().to_string_lossy().starts_with("event") {
            nodes.push(entry.path());
        }
    }
    nodes.sort();
    nodes
}

#[cfg(unix)]
mod unix {
    use std::fs::{File, OpenOptions};
    use std::io::{self, Read};
    use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
    use std::path::Path;
    use std::pin::Pin;
    use std::task::{Context, Poll, ready};

    use tokio::io::unix::AsyncFd;
    use tokio::io::{AsyncRead, ReadBuf};
    use tokio::net::unix::pipe;

    use super::DeviceReader;

    /// Character devices and FIFOs (used for replay) are polled through
    /// the reactor; regular files go through `tokio::fs`.
    ///
    /// `O_NONBLOCK` keeps opening a FIFO without a writer from blocking.
    pub(super) fn open(path: &Path) -> io::Result<DeviceReader> {
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)?;

        let file_type = file.metadata()?.file_type();
        if file_type.is_char_device() {
            Ok(Box::new(EventDevice {
                inner: AsyncFd::new(file)?,
            }))
        } else if file_type.is_fifo() {
            Ok(Box::new(pipe::Receiver::from_file(file)?))
        } else {
            Ok(Box::new(tokio::fs::File::from_std(file)))
        }
    }

    /// Non-blocking device node registered with the reactor.
    ///
    /// Dropping it deregisters and closes the descriptor immediately, which
    /// is what unblocks a pending read on shutdown.
    struct EventDevice {
        inner: AsyncFd<File>,
    }

    impl AsyncRead for EventDevice {
        fn poll_read(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            loop {
                let mut guard = ready!(self.inner.poll_read_ready(cx))?;
                let unfilled = buf.initialize_unfilled();
                match guard.try_io(|inner| inner.get_ref().read(unfilled)) {
                    Ok(Ok(len)) => {
                        buf.advance(len);
                        return Poll::Ready(Ok(()));
                    }
                    Ok(Err(err)) => return Poll::Ready(Err(err)),
                    Err(_would_block) => {}
                }
            }
        }
    }
}
