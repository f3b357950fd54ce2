//! PCM export of the audio section.

use log::debug;

use super::Container;
use super::format::AudioTrack;
use crate::codec::adpcm;
use crate::codec::mix::{SOURCE_SAMPLE_RATE, frame_offset, master_len, mix_into, resample_nearest};
use crate::error::Result;
use crate::schema::AudioConfig;

impl Container {
    /// Raw ADPCM bytes of `track`.
    pub fn track(&self, track: AudioTrack) -> &[u8] {
        &self.audio.tracks[track as usize]
    }

    /// Frame rate used for audio timing.
    fn timing_framerate(&self, config: &AudioConfig) -> f64 {
        f64::from(self.framerate().unwrap_or(config.fallback_framerate))
    }

    /// Playback length in seconds at the stored speed.
    pub fn duration(&self) -> f64 {
        self.duration_with(&AudioConfig::default())
    }

    pub fn duration_with(&self, config: &AudioConfig) -> f64 {
        self.frames.len() as f64 / self.timing_framerate(config)
    }

    /// Decode `track` and resample it to `sample_rate`.
    pub fn track_pcm(&self, track: AudioTrack, sample_rate: u32) -> Vec<i16> {
        let config = AudioConfig {
            sample_rate,
            ..AudioConfig::default()
        };
        self.track_pcm_with(track, &config)
    }

    /// Decode `track` and resample it to `config.sample_rate`.
    ///
    /// The BGM source rate is scaled by the ratio of playback speed to
    /// recording speed.
    pub fn track_pcm_with(&self, track: AudioTrack, config: &AudioConfig) -> Vec<i16> {
        let pcm = adpcm::decode(self.track(track));

        let mut src_rate = SOURCE_SAMPLE_RATE;
        if track == AudioTrack::Bgm
            && let Some(bgm_rate) = self.bgm_rate()
        {
            src_rate *= self.timing_framerate(config) / f64::from(bgm_rate);
        }

        if src_rate == f64::from(config.sample_rate) {
            return pcm;
        }
        resample_nearest(&pcm, src_rate, config.sample_rate)
    }

    /// Mix all tracks into one buffer at `config.sample_rate`.
    ///
    /// The BGM starts at sample 0; each sound effect starts at every frame
    /// whose flag selects it. Flags are ignored unless there is one per frame.
    pub fn master_pcm(&self, config: &AudioConfig) -> Result<Vec<i16>> {
        config.validate()?;
        let rate = config.sample_rate;
        let framerate = self.timing_framerate(config);
        let mut master = vec![0i16; master_len(self.duration_with(config), rate)];

        if !self.track(AudioTrack::Bgm).is_empty() {
            let bgm = self.track_pcm_with(AudioTrack::Bgm, config);
            mix_into(&mut master, &bgm, 0);
        }

        let effects: Vec<(u8, Vec<i16>)> = AudioTrack::ALL
            .iter()
            .filter(|&&track| !self.track(track).is_empty())
            .filter_map(|&track| {
                let flag = track.effect_flag()?;
                Some((flag, self.track_pcm_with(track, config)))
            })
            .collect();

        let flags = self.effective_sound_effect_flags().unwrap_or(&[]);
        if !effects.is_empty() {
            for (frame, &flag) in flags.iter().enumerate() {
                let offset = frame_offset(frame, rate, framerate);
                for (track_flag, pcm) in &effects {
                    if flag == *track_flag {
                        mix_into(&mut master, pcm, offset);
                    }
                }
            }
        }

        debug!(
            "Mixed {} samples at {} Hz ({} effect tracks)",
            master.len(),
            rate,
            effects.len()
        );
        Ok(master)
    }
}
