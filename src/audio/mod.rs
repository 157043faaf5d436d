//! Offline audio front-end
//!
//! This module provides:
//! - WAV file I/O
//! - Analysis windows
//! - Reference STFT
//! - Mel filterbank and log-mel features

mod io;
mod mel;
mod stft;
mod window;

pub use io::{load_wav, save_wav, AudioBuffer};
pub use mel::{
    hz_to_mel, logmelfilterbank, mel_filterbank, mel_to_hz, MelConfig, MelScale, MelSpectrogram,
    LOG_EPS,
};
pub use stft::{magnitude, pad_signal, stft, PadMode, StftConfig};
pub use window::{frame_window, pad_center, WindowType};

pub(crate) use stft::reflect_index;
