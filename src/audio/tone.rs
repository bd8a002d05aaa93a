//! Sample-accurate tone rendering
//!
//! A [`ToneTimeline`] holds gain/frequency automation in audio-clock seconds.
//! [`ToneRenderer`] turns it into samples, applying each event at the first
//! sample whose time reaches it, so note timing does not depend on how often
//! the host wakes up.

use super::backend::Waveform;

/// One automation event on a tone voice
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Automation {
    /// Set the output gain
    Gain(f32),
    /// Set the oscillator frequency in Hz
    Frequency(f32),
    /// Begin producing samples
    Start,
    /// End the voice
    Stop,
}

/// Time-ordered automation for a single tone voice
#[derive(Debug, Clone, Default)]
pub struct ToneTimeline {
    waveform: Waveform,
    events: Vec<(f64, Automation)>,
}

impl ToneTimeline {
    /// Empty timeline for the given oscillator
    pub fn new(waveform: Waveform) -> Self {
        Self {
            waveform,
            events: Vec::new(),
        }
    }

    /// Insert an event; events at equal times keep insertion order
    pub fn push(&mut self, at: f64, automation: Automation) {
        let index = self.events.partition_point(|(time, _)| *time <= at);
        self.events.insert(index, (at, automation));
    }

    /// Events in time order
    pub fn events(&self) -> &[(f64, Automation)] {
        &self.events
    }

    /// Oscillator shape
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Time of the earliest scheduled stop
    pub fn stop_time(&self) -> Option<f64> {
        self.events
            .iter()
            .find(|(_, automation)| *automation == Automation::Stop)
            .map(|(time, _)| *time)
    }
}

/// Renders a [`ToneTimeline`] into mono samples
#[derive(Debug, Clone)]
pub struct ToneRenderer {
    timeline: ToneTimeline,
    sample_rate: u32,
    origin: f64,
    frame: u64,
    cursor: usize,
    gain: f32,
    frequency: f32,
    phase: f32,
    started: bool,
    finished: bool,
}

impl ToneRenderer {
    /// `origin` is the audio clock time of the first rendered sample
    pub fn new(timeline: ToneTimeline, sample_rate: u32, origin: f64) -> Self {
        Self {
            timeline,
            sample_rate: sample_rate.max(1),
            origin,
            frame: 0,
            cursor: 0,
            gain: 0.0,
            frequency: 440.0,
            phase: 0.0,
            started: false,
            finished: false,
        }
    }

    /// Output sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Audio clock time of the next sample
    pub fn time(&self) -> f64 {
        self.origin + self.frame as f64 / self.sample_rate as f64
    }

    /// Whether the scheduled stop has been reached
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Samples left until the scheduled stop, if any
    pub fn remaining_frames(&self) -> Option<u64> {
        if self.finished {
            return Some(0);
        }
        let stop = self.timeline.stop_time()?;
        let remaining = ((stop - self.time()) * self.sample_rate as f64).ceil();
        Some(remaining.max(0.0) as u64)
    }

    fn apply_due_events(&mut self) {
        let now = self.time();
        let events = self.timeline.events();
        while let Some(&(time, automation)) = events.get(self.cursor) {
            if time > now {
                break;
            }
            match automation {
                Automation::Gain(level) => self.gain = level,
                Automation::Frequency(hz) => self.frequency = hz,
                Automation::Start => self.started = true,
                Automation::Stop => self.finished = true,
            }
            self.cursor += 1;
        }
    }

    /// Render into `out`, returning how many samples were written
    pub fn render(&mut self, out: &mut [f32]) -> usize {
        let mut written = 0;
        for slot in out.iter_mut() {
            match self.next() {
                Some(sample) => *slot = sample,
                None => break,
            }
            written += 1;
        }
        written
    }
}

impl Iterator for ToneRenderer {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.finished {
            return None;
        }
        self.apply_due_events();
        if self.finished {
            return None;
        }
        self.frame += 1;

        if !self.started {
            return Some(0.0);
        }

        let sample = self.timeline.waveform().sample(self.phase) * self.gain;
        self.phase = (self.phase + self.frequency / self.sample_rate as f32).fract();
        Some(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline() -> ToneTimeline {
        let mut timeline = ToneTimeline::new(Waveform::Square);
        timeline.push(0.0, Automation::Start);
        timeline.push(0.0, Automation::Gain(0.0));
        timeline.push(0.1, Automation::Gain(0.5));
        timeline.push(0.1, Automation::Frequency(100.0));
        timeline.push(0.2, Automation::Gain(0.0));
        timeline.push(0.3, Automation::Stop);
        timeline
    }

    #[test]
    fn test_push_keeps_time_order() {
        let mut timeline = ToneTimeline::new(Waveform::Square);
        timeline.push(0.5, Automation::Stop);
        timeline.push(0.1, Automation::Gain(0.2));
        timeline.push(0.1, Automation::Frequency(440.0));
        let times: Vec<f64> = timeline.events().iter().map(|(t, _)| *t).collect();
        assert_eq!(times, vec![0.1, 0.1, 0.5]);
        assert_eq!(timeline.events()[1].1, Automation::Frequency(440.0));
        assert_eq!(timeline.stop_time(), Some(0.5));
    }

    #[test]
    fn test_renderer_stops_on_schedule() {
        let renderer = ToneRenderer::new(timeline(), 1000, 0.0);
        let samples: Vec<f32> = renderer.collect();
        assert_eq!(samples.len(), 300);
    }

    #[test]
    fn test_renderer_gates_gain() {
        let samples: Vec<f32> = ToneRenderer::new(timeline(), 1000, 0.0).collect();
        assert!(samples[..100].iter().all(|s| *s == 0.0));
        assert!(samples[100..200].iter().all(|s| s.abs() == 0.5));
        assert!(samples[200..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_renderer_square_period() {
        let samples: Vec<f32> = ToneRenderer::new(timeline(), 1000, 0.0).collect();
        // 100 Hz at 1 kHz over 0.1 s is ten cycles
        let gated = &samples[100..200];
        let high = gated.iter().filter(|s| **s > 0.0).count();
        assert!((45..=55).contains(&high), "high samples: {}", high);
        let flips = gated
            .windows(2)
            .filter(|w| w[0].signum() != w[1].signum())
            .count();
        assert!((18..=21).contains(&flips), "sign flips: {}", flips);
    }

    #[test]
    fn test_renderer_origin_offset() {
        let mut renderer = ToneRenderer::new(timeline(), 1000, 0.25);
        assert_eq!(renderer.remaining_frames(), Some(50));
        let mut buf = [0.0f32; 128];
        assert_eq!(renderer.render(&mut buf), 50);
        assert!(renderer.is_finished());
    }

    #[test]
    fn test_silent_before_start() {
        let mut timeline = ToneTimeline::new(Waveform::Square);
        timeline.push(0.0, Automation::Gain(1.0));
        timeline.push(0.05, Automation::Start);
        timeline.push(0.1, Automation::Stop);
        let samples: Vec<f32> = ToneRenderer::new(timeline, 1000, 0.0).collect();
        assert!(samples[..50].iter().all(|s| *s == 0.0));
        assert!(samples[50..].iter().all(|s| *s != 0.0));
    }
}
