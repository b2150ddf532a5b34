use std::path::PathBuf;
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};
use image::RgbaImage;

/// A decode failure reported by the loader thread.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to decode image at {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("image at {path} has zero extent ({width}x{height})")]
    ZeroExtent {
        path: PathBuf,
        width: u32,
        height: u32,
    },
}

/// A successfully decoded catalog image.
#[derive(Debug)]
pub struct DecodedImage {
    pub name: String,
    pub rgba: RgbaImage,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.rgba.width()
    }

    pub fn height(&self) -> u32 {
        self.rgba.height()
    }
}

struct Completion {
    token: u64,
    result: Result<DecodedImage, LoadError>,
}

/// Off-thread image decoder with newest-request-wins semantics.
///
/// Each request gets a monotonically increasing token; a completion whose
/// token is older than the newest issued request is stale — another swap
/// was triggered while it decoded — and is dropped instead of applied.
pub(crate) struct ImageLoader {
    sender: Sender<Completion>,
    receiver: Receiver<Completion>,
    next_token: u64,
    newest: u64,
}

impl ImageLoader {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            next_token: 0,
            newest: 0,
        }
    }

    /// Starts decoding `path` on a worker thread.
    pub fn request(&mut self, name: String, path: PathBuf) {
        let token = self.begin_request();
        let sender = self.sender.clone();
        thread::spawn(move || {
            let result = decode(name, &path);
            // The viewer may have exited; a closed channel is fine.
            let _ = sender.send(Completion { token, result });
        });
    }

    /// Hands out the next request token and marks it newest.
    fn begin_request(&mut self) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        self.newest = token;
        token
    }

    /// Drains finished decodes, returning the newest-token completion if
    /// one arrived. Stale completions are logged and discarded.
    pub fn poll(&mut self) -> Option<Result<DecodedImage, LoadError>> {
        while let Ok(completion) = self.receiver.try_recv() {
            if completion.token != self.newest {
                tracing::debug!(
                    token = completion.token,
                    newest = self.newest,
                    "dropping stale image decode"
                );
                continue;
            }
            return Some(completion.result);
        }
        None
    }
}

fn decode(name: String, path: &PathBuf) -> Result<DecodedImage, LoadError> {
    let image = image::open(path).map_err(|source| LoadError::Decode {
        path: path.clone(),
        source,
    })?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(LoadError::ZeroExtent {
            path: path.clone(),
            width,
            height,
        });
    }
    tracing::info!(name = %name, width, height, "decoded image");
    Ok(DecodedImage { name, rgba })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_completion(token: u64, name: &str) -> Completion {
        Completion {
            token,
            result: Ok(DecodedImage {
                name: name.to_string(),
                rgba: RgbaImage::new(4, 4),
            }),
        }
    }

    #[test]
    fn newest_completion_is_applied() {
        let mut loader = ImageLoader::new();
        let token = loader.begin_request();
        loader.sender.send(ok_completion(token, "only")).unwrap();
        let decoded = loader.poll().unwrap().unwrap();
        assert_eq!(decoded.name, "only");
    }

    #[test]
    fn stale_completions_are_dropped() {
        let mut loader = ImageLoader::new();
        let stale = loader.begin_request();
        let newest = loader.begin_request();
        // The slower, superseded decode lands first.
        loader.sender.send(ok_completion(stale, "stale")).unwrap();
        loader.sender.send(ok_completion(newest, "newest")).unwrap();
        let decoded = loader.poll().unwrap().unwrap();
        assert_eq!(decoded.name, "newest");
        assert!(loader.poll().is_none());
    }

    #[test]
    fn stale_completion_alone_yields_nothing() {
        let mut loader = ImageLoader::new();
        let stale = loader.begin_request();
        loader.begin_request();
        loader.sender.send(ok_completion(stale, "stale")).unwrap();
        assert!(loader.poll().is_none());
    }

    #[test]
    fn missing_file_reports_a_decode_error() {
        let mut loader = ImageLoader::new();
        loader.request(
            "ghost".to_string(),
            PathBuf::from("/nonexistent/ghost.png"),
        );
        // The worker thread reports quickly for a missing path.
        let result = loader
            .receiver
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("loader thread must report");
        assert!(result.result.is_err());
    }
}
