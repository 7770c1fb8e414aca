pub mod capture;
pub mod http;
pub mod microphone;
pub mod playback;
pub mod storage;

pub use capture::FrameCaptureAdapter;
pub use http::HttpBackendAdapter;
pub use microphone::WavMicrophoneAdapter;
pub use playback::FilePlaybackAdapter;
pub use storage::FileStorageAdapter;
