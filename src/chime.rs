use rodio::{source::SineWave, Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use std::{fs::File, io::BufReader, path::PathBuf, time::Duration};

use crate::config::RatingWarningConfig;

const TONE_LENGTH: Duration = Duration::from_millis(140);
const TONES_HZ: [f32; 2] = [880.0, 1318.5];

/// Alert sound for the rating warning.
///
/// The output stream is opened on first use. If there is no audio device
/// the chime stays silent and says so once in the log.
pub struct Chime {
    sound: Option<PathBuf>,
    volume: f32,
    stream: Option<OutputStream>,
    unavailable: bool,
}

impl Chime {
    pub fn new(config: &RatingWarningConfig) -> Self {
        Self {
            sound: config.sound.clone(),
            volume: config.volume(),
            stream: None,
            unavailable: false,
        }
    }

    fn stream(&mut self) -> Option<&OutputStream> {
        if self.stream.is_none() && !self.unavailable {
            match OutputStreamBuilder::open_default_stream() {
                Ok(mut stream) => {
                    stream.log_on_drop(false);
                    self.stream = Some(stream);
                }
                Err(err) => {
                    log::warn!("No audio output for the rating chime: {err}");
                    self.unavailable = true;
                }
            }
        }
        self.stream.as_ref()
    }

    pub fn play(&mut self) {
        let volume = self.volume;
        let sound = self.sound.clone();
        let Some(stream) = self.stream() else {
            return;
        };

        let sink = Sink::connect_new(stream.mixer());
        sink.set_volume(volume);

        let from_file = sound.as_ref().and_then(|path| {
            File::open(path)
                .map_err(|err| err.to_string())
                .and_then(|file| Decoder::new(BufReader::new(file)).map_err(|err| err.to_string()))
                .map_err(|err| log::warn!("Chime {} unusable: {err}", path.display()))
                .ok()
        });

        match from_file {
            Some(decoder) => sink.append(decoder),
            None => {
                for hz in TONES_HZ {
                    sink.append(SineWave::new(hz).take_duration(TONE_LENGTH));
                }
            }
        }
        sink.detach();
    }
}
