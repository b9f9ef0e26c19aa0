// ── Device autodetection ──
//
// Finds the remote among several input nodes: first by a stable by-id
// name, otherwise by watching every candidate for real key presses
// inside a fixed window.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::{StreamExt, pin_mut};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::classify::{KeyAction, classify};
use super::decoder::{RecordLayout, event_stream};
use super::device::{DeviceOpener, DeviceReader};
use crate::config::DeviceConfig;

/// Suffix udev gives the keyboard-class node of a device.
const KBD_SUFFIX: &str = "-event-kbd";

/// How a device was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DetectMethod {
    ById,
    Sniff,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum AutodetectResult {
    Found { path: PathBuf, method: DetectMethod },
    NotFound,
}

impl AutodetectResult {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Found { path, .. } => Some(path),
            Self::NotFound => None,
        }
    }
}

/// Tuning for one autodetection run.
#[derive(Debug, Clone)]
pub struct AutodetectOptions {
    /// Hard deadline for the sniffing phase.
    pub window: Duration,
    /// Key-down events a candidate must produce to win. Zero counts as one.
    pub min_key_presses: u32,
    pub by_id_dir: Option<PathBuf>,
    pub name_fragment: Option<String>,
    pub layout: RecordLayout,
}

impl Default for AutodetectOptions {
    fn default() -> Self {
        Self::from(&DeviceConfig::default())
    }
}

impl From<&DeviceConfig> for AutodetectOptions {
    fn from(config: &DeviceConfig) -> Self {
        Self {
            window: config.autodetect_window,
            min_key_presses: config.min_key_presses,
            by_id_dir: config.by_id_dir.clone(),
            name_fragment: config.name_fragment.clone(),
            layout: config.layout,
        }
    }
}

/// Run autodetection over `candidates`.
///
/// Returns as soon as one candidate reaches `min_key_presses`, or
/// `NotFound` once the window elapses. Every stream opened here is
/// closed before this returns.
pub async fn autodetect(
    opener: &dyn DeviceOpener,
    candidates: &[PathBuf],
    options: &AutodetectOptions,
) -> AutodetectResult {
    match (&options.by_id_dir, &options.name_fragment) {
        (Some(dir), Some(fragment)) => {
            if let Some(path) = find_by_id(dir, fragment).await {
                info!(path = %path.display(), "remote found by id");
                return AutodetectResult::Found {
                    path,
                    method: DetectMethod::ById,
                };
            }
        }
        (Some(_), None) => debug!("no name fragment configured, skipping by-id lookup"),
        _ => {}
    }

    let deadline = tokio::time::Instant::now() + options.window;
    let readers: Vec<(PathBuf, DeviceReader)> = candidates
        .iter()
        .filter_map(|path| match opener.open(path) {
            Ok(reader) => Some((path.clone(), reader)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping candidate");
                None
            }
        })
        .collect();

    if readers.is_empty() {
        debug!("no candidate device could be opened");
        return AutodetectResult::NotFound;
    }

    info!(
        candidates = readers.len(),
        window = ?options.window,
        "press a remote key to identify the device"
    );

    let min_presses = options.min_key_presses.max(1);
    let (winner_tx, mut winner_rx) = mpsc::channel(readers.len());
    let mut sniffers = JoinSet::new();
    for (path, reader) in readers {
        sniffers.spawn(sniff(path, reader, options.layout, min_presses, winner_tx.clone()));
    }
    drop(winner_tx);

    // `Ok(None)` means every sniffer ended without a winner.
    let winner = tokio::time::timeout_at(deadline, winner_rx.recv())
        .await
        .ok()
        .flatten();

    // Aborting the sniffers drops their readers, closing every node.
    sniffers.shutdown().await;

    match winner {
        Some(path) => {
            info!(path = %path.display(), "remote detected");
            AutodetectResult::Found {
                path,
                method: DetectMethod::Sniff,
            }
        }
        None => {
            warn!("no remote detected within {:?}", options.window);
            AutodetectResult::NotFound
        }
    }
}

/// Count key-down events on one candidate; report it once it qualifies.
async fn sniff(
    path: PathBuf,
    reader: DeviceReader,
    layout: RecordLayout,
    min_presses: u32,
    winner_tx: mpsc::Sender<PathBuf>,
) {
    let events = event_stream(reader, layout);
    pin_mut!(events);

    let mut presses = 0u32;
    while let Some(Ok(raw)) = events.next().await {
        if classify(&raw).is_some_and(|event| event.action == KeyAction::Down) {
            presses += 1;
            debug!(path = %path.display(), presses, "key press");
            if presses >= min_presses {
                let _ = winner_tx.send(path).await;
                return;
            }
        }
    }
    debug!(path = %path.display(), presses, "candidate stream ended");
}

/// Entry under `dir` whose name contains `fragment` (case-insensitive).
///
/// Keyboard-class nodes are preferred, then lexical order.
pub async fn find_by_id(dir: &Path, fragment: &str) -> Option<PathBuf> {
    let needle = fragment.to_lowercase();
    if needle.is_empty() {
        return None;
    }

    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    let mut matches = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.to_lowercase().contains(&needle) {
            matches.push((name, entry.path()));
        }
    }

    matches.sort_by(|(a, _), (b, _)| {
        b.ends_with(KBD_SUFFIX)
            .cmp(&a.ends_with(KBD_SUFFIX))
            .then_with(|| a.cmp(b))
    });
    matches.into_iter().next().map(|(_, path)| path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::io;
    use std::sync::Mutex;

    use bytes::BytesMut;
    use tokio::io::{AsyncWriteExt, DuplexStream};
    use tokio_util::codec::Encoder;

    use super::*;
    use crate::input::decoder::{EventCodec, RawEvent};

    /// Hands out pre-registered in-memory streams by path.
    #[derive(Default)]
    struct DuplexOpener {
        streams: Mutex<HashMap<PathBuf, DuplexStream>>,
    }

    impl DuplexOpener {
        /// Register `path` and return the device side for writing.
        fn add(&self, path: &str) -> DuplexStream {
            let (reader, writer) = tokio::io::duplex(1024);
            self.streams.lock().unwrap().insert(PathBuf::from(path), reader);
            writer
        }
    }

    impl DeviceOpener for DuplexOpener {
        fn open(&self, path: &Path) -> io::Result<DeviceReader> {
            self.streams
                .lock()
                .unwrap()
                .remove(path)
                .map(|s| Box::new(s) as DeviceReader)
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such device"))
        }
    }

    fn key_bytes(code: u16, value: i32) -> Vec<u8> {
        let mut buf = BytesMut::new();
        EventCodec::new(RecordLayout::Timeval64)
            .encode(
                RawEvent {
                    timestamp_secs: 0,
                    timestamp_micros: 0,
                    type_code: 1,
                    code,
                    value,
                },
                &mut buf,
            )
            .unwrap();
        buf.to_vec()
    }

    fn options(window: Duration) -> AutodetectOptions {
        AutodetectOptions {
            window,
            min_key_presses: 2,
            by_id_dir: None,
            name_fragment: None,
            layout: RecordLayout::Timeval64,
        }
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn only_active_candidate_wins_and_losers_are_closed() {
        let opener = DuplexOpener::default();
        let mut a = opener.add("/dev/input/event0");
        let mut b = opener.add("/dev/input/event1");
        let _c = opener.add("/dev/input/event2");

        // One press and release on A is not enough.
        a.write_all(&key_bytes(115, 1)).await.unwrap();
        a.write_all(&key_bytes(115, 0)).await.unwrap();
        for _ in 0..2 {
            b.write_all(&key_bytes(164, 1)).await.unwrap();
            b.write_all(&key_bytes(164, 0)).await.unwrap();
        }

        let result = autodetect(
            &opener,
            &paths(&["/dev/input/event0", "/dev/input/event1", "/dev/input/event2"]),
            &options(Duration::from_secs(10)),
        )
        .await;

        assert_eq!(
            result,
            AutodetectResult::Found {
                path: PathBuf::from("/dev/input/event1"),
                method: DetectMethod::Sniff,
            }
        );

        // The reading side of A was dropped.
        let err = a.write_all(&key_bytes(115, 1)).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_qualifies_before_deadline() {
        let opener = DuplexOpener::default();
        let mut a = opener.add("a");
        let _b = opener.add("b");
        // Repeats and releases never count.
        a.write_all(&key_bytes(115, 2)).await.unwrap();
        a.write_all(&key_bytes(115, 0)).await.unwrap();

        let window = Duration::from_secs(10);
        let started = tokio::time::Instant::now();
        let result = autodetect(&opener, &paths(&["a", "b"]), &options(window)).await;

        assert_eq!(result, AutodetectResult::NotFound);
        assert!(started.elapsed() <= window);
    }

    #[tokio::test(start_paused = true)]
    async fn unopenable_candidates_are_skipped() {
        let opener = DuplexOpener::default();
        let mut b = opener.add("b");
        for _ in 0..2 {
            b.write_all(&key_bytes(115, 1)).await.unwrap();
        }

        let result = autodetect(&opener, &paths(&["missing", "b"]), &options(Duration::from_secs(1))).await;
        assert_eq!(result.path(), Some(Path::new("b")));
    }

    #[tokio::test]
    async fn by_id_prefers_keyboard_node() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "usb-Acme_Helm_Remote-event-mouse",
            "usb-Acme_Helm_Remote-if01-event-kbd",
            "usb-Other_Keyboard-event-kbd",
        ] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let mut opts = options(Duration::from_secs(1));
        opts.by_id_dir = Some(dir.path().to_path_buf());
        opts.name_fragment = Some("helm_remote".into());

        let result = autodetect(&DuplexOpener::default(), &[], &opts).await;
        assert_eq!(
            result,
            AutodetectResult::Found {
                path: dir.path().join("usb-Acme_Helm_Remote-if01-event-kbd"),
                method: DetectMethod::ById,
            }
        );
    }

    #[tokio::test]
    async fn by_id_needs_a_name_fragment() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("usb-Acme_Helm_Remote-event-kbd"), b"").unwrap();

        let mut opts = options(Duration::from_millis(50));
        opts.by_id_dir = Some(dir.path().to_path_buf());
        opts.name_fragment = None;

        let result = autodetect(&DuplexOpener::default(), &[], &opts).await;
        assert_eq!(result, AutodetectResult::NotFound);
    }

    #[tokio::test]
    async fn by_id_without_match_falls_through() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("usb-Other_Keyboard-event-kbd"), b"").unwrap();
        assert_eq!(find_by_id(dir.path(), "remote").await, None);
        assert_eq!(find_by_id(Path::new("/nonexistent/by-id"), "remote").await, None);
    }
}
