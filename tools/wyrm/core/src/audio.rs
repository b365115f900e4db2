//! Audio boundary. The presentation core only ever fires cues; the byte-code
//! player on the other side owns timing and mixing.

use log::warn;
use rtrb::{Consumer, Producer, RingBuffer};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SoundEffect {
    MenuMove,
    MenuConfirm,
    MenuCancel,
    TextBlip,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MusicTrack(pub u8);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AudioCue {
    Effect(SoundEffect),
    Music(MusicTrack),
}

/// Fire-and-forget audio calls. No return value, no callback.
pub trait AudioSink {
    fn play_effect(&mut self, effect: SoundEffect);
    fn play_music(&mut self, track: MusicTrack);
}

#[derive(Debug, Default)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn play_effect(&mut self, _: SoundEffect) {}
    fn play_music(&mut self, _: MusicTrack) {}
}

/// Cue producer backed by a lock-free ring; the player drains the consumer.
pub struct CueRing {
    producer: Producer<AudioCue>,
}

impl CueRing {
    pub fn new(capacity: usize) -> (Self, Consumer<AudioCue>) {
        let (producer, consumer) = RingBuffer::new(capacity);
        (Self { producer }, consumer)
    }

    fn push(&mut self, cue: AudioCue) {
        if let Err(e) = self.producer.push(cue) {
            warn!("audio cue dropped, ring is full: {:?}", e);
        }
    }
}

impl AudioSink for CueRing {
    fn play_effect(&mut self, effect: SoundEffect) {
        self.push(AudioCue::Effect(effect));
    }

    fn play_music(&mut self, track: MusicTrack) {
        self.push(AudioCue::Music(track));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cues_arrive_in_order_and_overflow_is_dropped() {
        let (mut ring, mut consumer) = CueRing::new(2);
        ring.play_effect(SoundEffect::MenuMove);
        ring.play_music(MusicTrack(3));
        ring.play_effect(SoundEffect::MenuConfirm);

        assert_eq!(consumer.pop(), Ok(AudioCue::Effect(SoundEffect::MenuMove)));
        assert_eq!(consumer.pop(), Ok(AudioCue::Music(MusicTrack(3))));
        assert!(consumer.pop().is_err());
    }
}
