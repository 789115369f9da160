//! Completion-alarm capability.
//!
//! The session manager signals "play completion sound" through the
//! [`NotificationSink`] trait instead of touching any process-wide audio
//! state. The rodio-backed [`AlarmPlayer`] is the production sink; hosts
//! that run headless (or tests) inject [`NullNotifier`].

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use rodio::source::{SineWave, Source};
use rodio::{Decoder, OutputStream, Sink};

use crate::error::NotifyError;

/// A listener for the session manager's completion signal.
///
/// Fire-and-forget: the only contract is success/failure of kicking off the
/// alarm. The session rotation never waits for playback.
pub trait NotificationSink {
    fn play_completion(&mut self) -> Result<(), NotifyError>;
}

/// Silent sink for headless hosts and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl NotificationSink for NullNotifier {
    fn play_completion(&mut self) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Plays the completion alarm through the default audio output.
///
/// Playback happens on a dedicated short-lived thread because rodio's output
/// stream is not `Send` and must live until the sound finishes; the calling
/// thread returns immediately.
#[derive(Debug, Default, Clone)]
pub struct AlarmPlayer {
    custom_sound: Option<PathBuf>,
}

impl AlarmPlayer {
    pub fn new(custom_sound: Option<PathBuf>) -> Self {
        Self { custom_sound }
    }
}

impl NotificationSink for AlarmPlayer {
    fn play_completion(&mut self) -> Result<(), NotifyError> {
        // Surface an unreadable sound file to the caller; failures past this
        // point happen on the audio thread and are only logged.
        if let Some(path) = &self.custom_sound {
            File::open(path).map_err(|e| NotifyError::SoundFile {
                path: path.clone(),
                message: e.to_string(),
            })?;
        }

        let custom_sound = self.custom_sound.clone();
        thread::Builder::new()
            .name("pomotick-alarm".to_string())
            .spawn(move || {
                if let Err(e) = play_alarm(custom_sound) {
                    tracing::warn!("alarm playback failed: {e}");
                }
            })
            .map_err(|e| NotifyError::OutputUnavailable(e.to_string()))?;
        Ok(())
    }
}

fn play_alarm(custom_sound: Option<PathBuf>) -> Result<(), NotifyError> {
    let (_stream, handle) = OutputStream::try_default()
        .map_err(|e| NotifyError::OutputUnavailable(e.to_string()))?;
    let sink =
        Sink::try_new(&handle).map_err(|e| NotifyError::OutputUnavailable(e.to_string()))?;

    match custom_sound {
        Some(path) => {
            let file = File::open(&path).map_err(|e| NotifyError::SoundFile {
                path: path.clone(),
                message: e.to_string(),
            })?;
            let source = Decoder::new(BufReader::new(file)).map_err(|e| {
                NotifyError::SoundFile {
                    path,
                    message: e.to_string(),
                }
            })?;
            sink.append(source);
        }
        None => {
            // Default chime: three short beeps.
            for _ in 0..3 {
                sink.append(
                    SineWave::new(880.0)
                        .take_duration(Duration::from_millis(200))
                        .amplify(0.35)
                        .delay(Duration::from_millis(100)),
                );
            }
        }
    }

    sink.sleep_until_end();
    Ok(())
}
