/// Sound engine: procedural 8-bit style sound effects via rodio.
///
/// All sounds are generated as in-memory WAV buffers at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink.
///
/// Compile with `--no-default-features` or without "sound" feature
/// to disable audio entirely (the stub SoundEngine does nothing).

use crate::sim::event::GameEvent;

/// One sound effect. Several events may share a cue.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cue {
    Pickup,
    Drop,
    Deliver,
    Push,
    Gate,
    Solved,
    Complete,
}

/// Which cue, if any, an event should play.
pub fn cue_for(event: &GameEvent) -> Option<Cue> {
    match event {
        GameEvent::MailPicked { .. } => Some(Cue::Pickup),
        GameEvent::MailDropped { .. } => Some(Cue::Drop),
        GameEvent::MailDelivered { .. } => Some(Cue::Deliver),
        GameEvent::BoxPushed { .. } => Some(Cue::Push),
        GameEvent::GateChanged { .. } => Some(Cue::Gate),
        GameEvent::RoomSolved { .. } => Some(Cue::Solved),
        GameEvent::GameComplete => Some(Cue::Complete),
        GameEvent::PlateChanged { .. } | GameEvent::RoomEntered { .. } => None,
    }
}

/// Distinct cues for one tick, in first-seen order. Two gates opening
/// together play one sound.
pub fn cues(events: &[GameEvent]) -> Vec<Cue> {
    let mut out: Vec<Cue> = Vec::with_capacity(events.len());
    for cue in events.iter().filter_map(cue_for) {
        if !out.contains(&cue) {
            out.push(cue);
        }
    }
    out
}

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use super::Cue;

    const SAMPLE_RATE: u32 = 22050;

    /// Pre-generated WAV buffers for each sound effect.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_pickup: Arc<Vec<u8>>,
        sfx_drop: Arc<Vec<u8>>,
        sfx_deliver: Arc<Vec<u8>>,
        sfx_push: Arc<Vec<u8>>,
        sfx_gate: Arc<Vec<u8>>,
        sfx_solved: Arc<Vec<u8>>,
        sfx_complete: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = OutputStream::try_default().ok()?;

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_pickup: Arc::new(make_wav(&gen_pickup())),
                sfx_drop: Arc::new(make_wav(&gen_sweep(700.0, 300.0, 0.1, 0.25))),
                sfx_deliver: Arc::new(make_wav(&gen_chime())),
                sfx_push: Arc::new(make_wav(&gen_thud())),
                sfx_gate: Arc::new(make_wav(&gen_sweep(220.0, 440.0, 0.14, 0.2))),
                sfx_solved: Arc::new(make_wav(&gen_fanfare(&[523.0, 659.0, 784.0], 0.09))),
                sfx_complete: Arc::new(make_wav(&gen_fanfare(&[523.0, 659.0, 784.0, 1047.0], 0.12))),
            })
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }

        pub fn play_cue(&self, cue: Cue) {
            let buf = match cue {
                Cue::Pickup => &self.sfx_pickup,
                Cue::Drop => &self.sfx_drop,
                Cue::Deliver => &self.sfx_deliver,
                Cue::Push => &self.sfx_push,
                Cue::Gate => &self.sfx_gate,
                Cue::Solved => &self.sfx_solved,
                Cue::Complete => &self.sfx_complete,
            };
            self.play(buf);
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn sine(t: f32, freq: f32) -> f32 {
        (t * freq * 2.0 * std::f32::consts::PI).sin()
    }

    /// Pickup: quick ascending arpeggio C6→E6→G6
    fn gen_pickup() -> Vec<f32> {
        let notes = [1047.0_f32, 1319.0, 1568.0];
        let note_dur = 0.04;
        let mut samples = Vec::new();
        for &freq in &notes {
            let n = (SAMPLE_RATE as f32 * note_dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                // Square-ish wave (sine + 3rd harmonic) for retro feel
                let wave = sine(t, freq) * 0.7 + sine(t, freq * 3.0) * 0.3;
                samples.push(wave * env * 0.25);
            }
        }
        samples
    }

    /// Linear pitch sweep; used for throws (down) and gates (up).
    fn gen_sweep(from: f32, to: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = from + (to - from) * t;
                phase += freq / SAMPLE_RATE as f32;
                let env = (1.0 - t).powf(0.6);
                (phase * 2.0 * std::f32::consts::PI).sin() * env * volume
            })
            .collect()
    }

    /// Delivery: two-note chime G5, C6
    fn gen_chime() -> Vec<f32> {
        let pairs = [(784.0_f32, 0.07), (1047.0, 0.14)];
        let mut samples = Vec::new();
        for &(freq, dur) in &pairs {
            let n = (SAMPLE_RATE as f32 * dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                let wave = sine(t, freq) * 0.7 + sine(t, freq * 2.0) * 0.3;
                samples.push(wave * env * 0.3);
            }
        }
        samples
    }

    /// Box push: low noisy thud
    fn gen_thud() -> Vec<f32> {
        let duration = 0.08;
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut rng: u32 = 12345;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let ti = i as f32 / SAMPLE_RATE as f32;
                let tone = sine(ti, 90.0 + (1.0 - t) * 60.0);
                // Simple LCG noise
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                (tone * 0.7 + noise * 0.3) * (1.0 - t) * 0.3
            })
            .collect()
    }

    /// Ascending fanfare with a sustained last note.
    fn gen_fanfare(notes: &[f32], note_dur: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for &freq in notes {
            let n = (SAMPLE_RATE as f32 * note_dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32) * 0.3;
                let wave = sine(t, freq) * 0.6
                    + sine(t, freq * 2.0) * 0.3
                    + sine(t, freq * 3.0) * 0.1;
                samples.push(wave * env * 0.3);
            }
        }
        if let Some(&last) = notes.last() {
            let n = (SAMPLE_RATE as f32 * 0.25) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32);
                samples.push(sine(t, last) * env * 0.3);
            }
        }
        samples
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2; // 16-bit = 2 bytes per sample
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        // RIFF header
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        // fmt chunk
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        buf.extend_from_slice(&1u16.to_le_bytes());  // PCM format
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        // data chunk
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn wav_header_sizes() {
            let wav = make_wav(&gen_thud());
            assert_eq!(&wav[0..4], b"RIFF");
            assert_eq!(&wav[8..12], b"WAVE");
            let data = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]);
            assert_eq!(wav.len(), 44 + data as usize);
        }
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
    pub fn play_cue(&self, _cue: Cue) {}
}

impl SoundEngine {
    pub fn play_events(&self, events: &[GameEvent]) {
        for cue in cues(events) {
            self.play_cue(cue);
        }
    }
}
