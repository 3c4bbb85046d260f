/// Sound engine: procedural chiptune effects via rodio.
///
/// All sounds are generated as in-memory WAV buffers at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile without the "sound" feature to disable audio entirely
/// (the stub SoundEngine does nothing).

use crate::sim::event::GameEvent;

#[cfg(feature = "sound")]
mod inner {
    use std::f32::consts::TAU;
    use std::io::Cursor;
    use std::sync::Arc;

    use log::{debug, warn};
    use rodio::{OutputStream, OutputStreamHandle, Sink};

    const SAMPLE_RATE: u32 = 22050;

    /// Pre-generated WAV buffers for each sound effect.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_item: Arc<Vec<u8>>,
        sfx_lab_clear: Arc<Vec<u8>>,
        sfx_victory: Arc<Vec<u8>>,
        sfx_reset: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("no audio output: {}", e);
                    return None;
                }
            };

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_item: Arc::new(make_wav(&gen_pickup())),
                sfx_lab_clear: Arc::new(make_wav(&gen_chime())),
                sfx_victory: Arc::new(make_wav(&gen_fanfare())),
                sfx_reset: Arc::new(make_wav(&gen_sweep_down())),
            })
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            let sink = match Sink::try_new(&self.handle) {
                Ok(s) => s,
                Err(e) => {
                    debug!("sink unavailable: {}", e);
                    return;
                }
            };
            let cursor = Cursor::new(buf.as_ref().clone());
            if let Ok(src) = rodio::Decoder::new(cursor) {
                sink.append(src);
                sink.detach();
            }
        }

        pub fn play_item(&self) { self.play(&self.sfx_item); }
        pub fn play_lab_clear(&self) { self.play(&self.sfx_lab_clear); }
        pub fn play_victory(&self) { self.play(&self.sfx_victory); }
        pub fn play_reset(&self) { self.play(&self.sfx_reset); }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn samples_for(seconds: f32) -> usize {
        (SAMPLE_RATE as f32 * seconds) as usize
    }

    /// Item pickup: quick ascending arpeggio C6→E6→G6
    pub(super) fn gen_pickup() -> Vec<f32> {
        let mut samples = Vec::new();
        for &freq in &[1047.0_f32, 1319.0, 1568.0] {
            let n = samples_for(0.045);
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                // Sine + 3rd harmonic for a square-ish edge
                let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 3.0 * TAU).sin() * 0.3;
                samples.push(wave * env * 0.25);
            }
        }
        samples
    }

    /// Labyrinth cleared: two-note chime G5, C6
    pub(super) fn gen_chime() -> Vec<f32> {
        let mut samples = Vec::new();
        for &(freq, dur) in &[(784.0_f32, 0.08_f32), (1047.0, 0.15)] {
            let n = samples_for(dur);
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 2.0 * TAU).sin() * 0.3;
                samples.push(wave * env * 0.3);
            }
        }
        samples
    }

    /// Victory: C5→E5→G5→C6 with a sustained final note
    pub(super) fn gen_fanfare() -> Vec<f32> {
        let mut samples = Vec::new();
        for &freq in &[523.0_f32, 659.0, 784.0, 1047.0] {
            let n = samples_for(0.1);
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * 0.3;
                let wave = (t * freq * TAU).sin() * 0.6
                    + (t * freq * 2.0 * TAU).sin() * 0.3
                    + (t * freq * 3.0 * TAU).sin() * 0.1;
                samples.push(wave * env * 0.3);
            }
        }
        let n = samples_for(0.4);
        for i in 0..n {
            let t = i as f32 / SAMPLE_RATE as f32;
            let env = 1.0 - (i as f32 / n as f32);
            samples.push((t * 1047.0 * TAU).sin() * env * 0.3);
        }
        samples
    }

    /// Scene reset: short descending sweep, 600Hz → 200Hz
    pub(super) fn gen_sweep_down() -> Vec<f32> {
        let n = samples_for(0.15);
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = 600.0 - t * 400.0;
                phase += freq * TAU / SAMPLE_RATE as f32;
                phase.sin() * (1.0 - t).powf(0.6) * 0.25
            })
            .collect()
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    pub(super) fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        buf.extend_from_slice(&1u16.to_le_bytes());  // PCM
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_item(&self) {}
    pub fn play_lab_clear(&self) {}
    pub fn play_victory(&self) {}
    pub fn play_reset(&self) {}
}

impl SoundEngine {
    /// Play the effect for a simulation event.
    pub fn play_event(&self, event: &GameEvent) {
        match event {
            GameEvent::ItemCollected { .. } => self.play_item(),
            GameEvent::LabyrinthCleared { .. } => self.play_lab_clear(),
            GameEvent::Victory => self.play_victory(),
            GameEvent::SceneReset => self.play_reset(),
            GameEvent::LabyrinthEntered { .. } => {}
        }
    }
}
