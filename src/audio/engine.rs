// Audio engine - CPAL output running the click voices
//
// # Format Support
//
// The stream is built for the device's preferred sample format (F32, I16 or
// U16). Everything is rendered in f32 and converted when written to the
// output buffer, through CPAL's `FromSample<f32>`.
//
// # Clock
//
// The playback clock is the number of frames rendered so far. It is shared
// with the scheduler through `AudioClock` and advanced at the end of every
// callback, so it stands still while the stream is paused.
//
// # Stream Limitations
//
// On macOS (CoreAudio) the Stream is not Send/Sync. The output is therefore
// created on the engine thread that uses it, on the first `start`.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Producer};

use crate::audio::device::OutputDeviceManager;
use crate::audio::dsp_utils::{OnePoleSmoother, flush_denormals_to_zero, soft_clip};
use crate::audio::output::{AudioOutput, OutputProvider, OutputState};
use crate::audio::parameters::AtomicF32;
use crate::audio::timing::AudioClock;
use crate::config::EngineConfig;
use crate::error::MetronomeError;
use crate::messaging::channels::{
    ClickConsumer, ClickProducer, NotificationConsumer, NotificationProducer,
    create_click_channel, create_notification_channel,
};
use crate::messaging::notification::{Notification, NotificationCategory};
use crate::synth::click::{ClickSink, ScheduledClick};
use crate::synth::voice_manager::VoiceManager;

/// Master volume applied after mixing
pub const DEFAULT_VOLUME: f32 = 0.8;

/// Creates CPAL outputs on the default (or a named) device
pub struct CpalProvider {
    device_name: Option<String>,
    engine_config: EngineConfig,
    volume: AtomicF32,
}

impl CpalProvider {
    pub fn new(engine_config: EngineConfig) -> Self {
        Self {
            device_name: None,
            engine_config,
            volume: AtomicF32::new(DEFAULT_VOLUME),
        }
    }

    /// Use the output device called `name` instead of the default one
    pub fn with_device(mut self, name: impl Into<String>) -> Self {
        self.device_name = Some(name.into());
        self
    }

    /// Volume shared with every output this provider creates
    pub fn volume(&self) -> AtomicF32 {
        self.volume.clone()
    }
}

impl OutputProvider for CpalProvider {
    type Output = CpalOutput;

    fn acquire(&mut self) -> Result<CpalOutput, MetronomeError> {
        let manager = OutputDeviceManager::new();
        let device = manager
            .find_output_device(self.device_name.as_deref())
            .ok_or_else(|| MetronomeError::AudioUnavailable("No audio device found".to_string()))?;

        CpalOutput::new(device, &self.engine_config, self.volume.clone())
    }
}

/// Running CPAL stream plus the queues feeding it
pub struct CpalOutput {
    _device: Device,
    stream: Stream,
    clock: AudioClock,
    click_tx: ClickProducer,
    notification_rx: NotificationConsumer,
    state: OutputState,
}

impl CpalOutput {
    fn new(
        device: Device,
        engine_config: &EngineConfig,
        volume: AtomicF32,
    ) -> Result<Self, MetronomeError> {
        log::info!(
            "Audio device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let supported_config = device
            .default_output_config()
            .map_err(|e| MetronomeError::AudioUnavailable(format!("Configuration error: {}", e)))?;

        let sample_format = supported_config.sample_format();
        let sample_rate = supported_config.sample_rate().0 as f32;
        let channels = supported_config.channels() as usize;
        log::debug!("Audio config: {:?}", supported_config);

        let config: StreamConfig = supported_config.into();

        let clock = AudioClock::new(sample_rate);
        let (click_tx, click_rx) = create_click_channel(engine_config.click_queue_capacity);
        let (notification_tx, notification_rx) =
            create_notification_channel(engine_config.notification_capacity);

        let render = CallbackState {
            channels,
            clock: clock.clone(),
            click_rx,
            voices: VoiceManager::new(sample_rate),
            volume: volume.clone(),
            // 10ms time constant to avoid zipper noise
            volume_smoother: OnePoleSmoother::new(volume.get(), 10.0, sample_rate),
        };

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(&device, &config, render, notification_tx),
            SampleFormat::I16 => Self::build_stream::<i16>(&device, &config, render, notification_tx),
            SampleFormat::U16 => Self::build_stream::<u16>(&device, &config, render, notification_tx),
            _ => {
                return Err(MetronomeError::AudioUnavailable(format!(
                    "Unsupported sample format: {:?}. Supported formats: F32, I16, U16",
                    sample_format
                )));
            }
        }?;

        // Some hosts start streams immediately; the output starts suspended
        if let Err(e) = stream.pause() {
            log::debug!("Could not pause new stream: {}", e);
        }

        log::info!("Audio output ready: {} Hz, {} channels", sample_rate, channels);

        Ok(Self {
            _device: device,
            stream,
            clock,
            click_tx,
            notification_rx,
            state: OutputState::Suspended,
        })
    }

    pub fn sample_rate(&self) -> f32 {
        self.clock.sample_rate()
    }

    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        mut render: CallbackState,
        mut notification_tx: NotificationProducer,
    ) -> Result<Stream, MetronomeError>
    where
        T: SizedSample + FromSample<f32> + Send + 'static,
    {
        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    // No allocations, no I/O, no locks
                    render.process(data);
                },
                move |err| {
                    // Runs outside the audio callback
                    let notif = Notification::error(
                        NotificationCategory::Audio,
                        format!("Audio stream error: {}", err),
                    );
                    let _ = notification_tx.try_push(notif);
                },
                None,
            )
            .map_err(|e| MetronomeError::AudioUnavailable(format!("Error in stream creation: {}", e)))
    }
}

impl ClickSink for CpalOutput {
    fn schedule_click(&mut self, click: ScheduledClick) {
        if self.click_tx.try_push(click).is_err() {
            log::warn!("Click queue full, dropping click at {:.3}s", click.start_time);
        }
    }
}

impl AudioOutput for CpalOutput {
    fn current_time(&self) -> f64 {
        self.clock.current_time()
    }

    fn state(&self) -> OutputState {
        self.state
    }

    fn resume(&mut self) -> Result<(), MetronomeError> {
        self.stream
            .play()
            .map_err(|e| MetronomeError::ResumeFailed(e.to_string()))?;
        self.state = OutputState::Running;
        Ok(())
    }

    fn poll_notification(&mut self) -> Option<Notification> {
        self.notification_rx.try_pop()
    }
}

/// Everything the output callback owns
struct CallbackState {
    channels: usize,
    clock: AudioClock,
    click_rx: ClickConsumer,
    voices: VoiceManager,
    volume: AtomicF32,
    volume_smoother: OnePoleSmoother,
}

impl CallbackState {
    fn process<T>(&mut self, data: &mut [T])
    where
        T: SizedSample + FromSample<f32>,
    {
        let first_frame = self.clock.current_frame();

        while let Some(click) = self.click_rx.try_pop() {
            self.voices.schedule(&click, first_frame);
        }

        let mut frames = 0;
        for (i, frame) in data.chunks_mut(self.channels.max(1)).enumerate() {
            let volume = self.volume_smoother.process(self.volume.get());

            let mut sample = self.voices.next_sample(first_frame + i as u64);
            sample = flush_denormals_to_zero(sample);
            sample *= volume;
            sample = soft_clip(sample);

            write_mono_to_interleaved_frame(sample, frame);
            frames += 1;
        }

        self.clock.advance(frames);
    }
}

/// Same sample on every channel of the frame
#[inline]
fn write_mono_to_interleaved_frame<T>(sample: f32, frame: &mut [T])
where
    T: SizedSample + FromSample<f32>,
{
    let value = T::from_sample(sample);
    for channel_sample in frame.iter_mut() {
        *channel_sample = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::click::ClickSynthesizer;
    use crate::synth::sound::ClickSoundType;

    fn callback_state(sample_rate: f32, channels: usize) -> (CallbackState, ClickProducer) {
        let (click_tx, click_rx) = create_click_channel(16);
        let state = CallbackState {
            channels,
            clock: AudioClock::new(sample_rate),
            click_rx,
            voices: VoiceManager::new(sample_rate),
            volume: AtomicF32::new(1.0),
            volume_smoother: OnePoleSmoother::new(1.0, 10.0, sample_rate),
        };
        (state, click_tx)
    }

    #[test]
    fn test_callback_advances_clock_by_frames() {
        let (mut state, _tx) = callback_state(48000.0, 2);
        let mut buffer = vec![0.0f32; 512 * 2];
        state.process(&mut buffer);
        assert_eq!(state.clock.current_frame(), 512);
        state.process(&mut buffer);
        assert_eq!(state.clock.current_frame(), 1024);
    }

    #[test]
    fn test_silence_without_clicks() {
        let (mut state, _tx) = callback_state(48000.0, 1);
        let mut buffer = vec![1.0f32; 256];
        state.process(&mut buffer);
        assert!(buffer.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_click_lands_on_its_frame() {
        let (mut state, mut tx) = callback_state(1000.0, 2);
        // Frame 100 at 1kHz
        let click = ClickSynthesizer::prepare(0.1, 50.0, 0.04, false, ClickSoundType::Classic);
        tx.try_push(click).unwrap();

        let mut buffer = vec![0.0f32; 256 * 2];
        state.process(&mut buffer);

        let left: Vec<f32> = buffer.chunks(2).map(|f| f[0]).collect();
        assert!(left[..100].iter().all(|&s| s == 0.0));
        assert!(left[100..140].iter().any(|&s| s != 0.0));
        // Both channels carry the same signal
        assert!(buffer.chunks(2).all(|f| f[0] == f[1]));
    }

    #[test]
    fn test_integer_output_format() {
        let (mut state, mut tx) = callback_state(1000.0, 1);
        let click = ClickSynthesizer::prepare(0.0, 50.0, 0.04, true, ClickSoundType::Electronic);
        tx.try_push(click).unwrap();

        let mut buffer = vec![0i16; 64];
        state.process(&mut buffer);
        assert!(buffer.iter().any(|&s| s != 0));
    }
}
